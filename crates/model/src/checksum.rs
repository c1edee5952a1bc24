use serde::{Deserialize, Serialize};
use std::fmt;

/// Which cluster of a source/target pair a record was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn is_source(self) -> bool {
        matches!(self, Side::Source)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Checksum of a single shard, or the reason it could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardChecksum {
    pub shard_id: String,
    pub result: Result<String, String>,
}

impl ShardChecksum {
    pub fn ok(shard_id: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            result: Ok(checksum.into()),
        }
    }

    pub fn failed(shard_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            result: Err(error.into()),
        }
    }
}

/// All shard checksums of one collection on one side.
///
/// Shards are kept sorted by id so that two records can be compared position
/// by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionChecksum {
    pub database: String,
    pub collection: String,
    pub side: Side,
    pub shards: Vec<ShardChecksum>,
}

impl CollectionChecksum {
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
        side: Side,
        mut shards: Vec<ShardChecksum>,
    ) -> Self {
        shards.sort_by(|a, b| a.shard_id.cmp(&b.shard_id));
        Self {
            database: database.into(),
            collection: collection.into(),
            side,
            shards,
        }
    }

    /// Matching key: `database.collection`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

/// Two checksums are equal only when both are non-empty decimal strings with
/// identical digits.
pub fn checksums_equal(a: &str, b: &str) -> bool {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    is_number(a) && is_number(b) && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_are_sorted_on_construction() {
        let record = CollectionChecksum::new(
            "db",
            "docs",
            Side::Source,
            vec![
                ShardChecksum::ok("s3", "3"),
                ShardChecksum::ok("s1", "1"),
                ShardChecksum::ok("s2", "2"),
            ],
        );

        let ids: Vec<_> = record.shards.iter().map(|s| s.shard_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(record.full_name(), "db.docs");
    }

    #[test]
    fn checksum_equality_requires_digits() {
        assert!(checksums_equal("12345", "12345"));
        assert!(!checksums_equal("12345", "12346"));
        assert!(!checksums_equal("abc", "abc"));
        assert!(!checksums_equal("", ""));
        assert!(!checksums_equal("-1", "-1"));
    }

    #[test]
    fn shard_results_keep_the_failure_reason() {
        assert_eq!(ShardChecksum::ok("s1", "42").result, Ok("42".to_string()));
        assert_eq!(
            ShardChecksum::failed("s2", "timeout").result,
            Err("timeout".to_string())
        );
    }
}
