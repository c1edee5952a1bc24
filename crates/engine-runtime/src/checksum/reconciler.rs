use model::checksum::{CollectionChecksum, Side, checksums_equal};
use std::collections::BTreeMap;

/// Verdict on one pair of records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub ok: u64,
    pub errors: u64,
    pub lines: Vec<String>,
}

impl Status {
    fn error(line: String) -> Self {
        Self {
            ok: 0,
            errors: 1,
            lines: vec![line],
        }
    }
}

/// Compares the records of one collection from both sides, shard by shard.
pub fn checksum_status(a: &CollectionChecksum, b: &CollectionChecksum, verbose: bool) -> Status {
    if a.side == b.side {
        return Status::error(format!(
            "ERROR both records of '{}' come from the {} cluster",
            a.full_name(),
            a.side
        ));
    }
    let (source, target) = if a.side.is_source() { (a, b) } else { (b, a) };

    if source.shards.len() != target.shards.len() {
        return Status::error(format!(
            "ERROR the collection '{}' has different number of shards, source: {}, target: {}",
            source.full_name(),
            source.shards.len(),
            target.shards.len()
        ));
    }

    let mut status = Status::default();
    let name = source.full_name();
    for (s, t) in source.shards.iter().zip(&target.shards) {
        let describe = |r: &Result<String, String>| match r {
            Ok(checksum) | Err(checksum) => checksum.clone(),
        };
        let equal = matches!(
            (&s.result, &t.result),
            (Ok(x), Ok(y)) if checksums_equal(x, y)
        );
        if equal {
            status.ok += 1;
            if verbose {
                status.lines.push(format!(
                    "OK {name}, source: {}, target: {}",
                    describe(&s.result),
                    describe(&t.result)
                ));
            }
        } else {
            status.errors += 1;
            status.lines.push(format!(
                "ERROR {name}\n\tsource: {}\n\ttarget: {}",
                describe(&s.result),
                describe(&t.result)
            ));
        }
    }
    status
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChecksumReport {
    pub ok: u64,
    pub errors: u64,
    /// Verdict lines followed by one line per one-sided collection.
    pub lines: Vec<String>,
}

impl ChecksumReport {
    pub fn summary(&self) -> String {
        format!("OK: {}, errors: {}", self.ok, self.errors)
    }
}

/// Pairs records arriving in any order by `(database, collection)`.
#[derive(Debug, Default)]
pub struct Reconciler {
    verbose: bool,
    pending: BTreeMap<(String, String), CollectionChecksum>,
    report: ChecksumReport,
}

impl Reconciler {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    /// Returns `true` when the record completed a pair and the tally moved.
    pub fn accept(&mut self, record: CollectionChecksum) -> bool {
        let key = (record.database.clone(), record.collection.clone());
        let Some(other) = self.pending.remove(&key) else {
            self.pending.insert(key, record);
            return false;
        };
        let status = checksum_status(&other, &record, self.verbose);
        self.report.ok += status.ok;
        self.report.errors += status.errors;
        self.report.lines.extend(status.lines);
        true
    }

    pub fn ok(&self) -> u64 {
        self.report.ok
    }

    pub fn errors(&self) -> u64 {
        self.report.errors
    }

    /// Everything still unpaired exists on one side only.
    pub fn finish(mut self) -> ChecksumReport {
        for ((database, collection), record) in std::mem::take(&mut self.pending) {
            self.report.errors += 1;
            let missing_on = match record.side {
                Side::Source => "target",
                Side::Target => "source",
            };
            self.report.lines.push(format!(
                "ERROR the collection '{database}.{collection}' does not exist on the {missing_on} data center"
            ));
        }
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::checksum::ShardChecksum;

    fn record(side: Side, collection: &str, shards: &[(&str, &str)]) -> CollectionChecksum {
        CollectionChecksum::new(
            "db",
            collection,
            side,
            shards
                .iter()
                .map(|(id, sum)| ShardChecksum::ok(*id, *sum))
                .collect(),
        )
    }

    #[test]
    fn equal_shards_are_ok() {
        let status = checksum_status(
            &record(Side::Source, "docs", &[("s1", "11"), ("s2", "22")]),
            &record(Side::Target, "docs", &[("s2", "22"), ("s1", "11")]),
            true,
        );
        assert_eq!(status.ok, 2);
        assert_eq!(status.errors, 0);
        assert_eq!(status.lines[0], "OK db.docs, source: 11, target: 11");
    }

    #[test]
    fn quiet_mode_only_reports_mismatches() {
        let status = checksum_status(
            &record(Side::Target, "docs", &[("s1", "11"), ("s2", "23")]),
            &record(Side::Source, "docs", &[("s1", "11"), ("s2", "22")]),
            false,
        );
        assert_eq!((status.ok, status.errors), (1, 1));
        assert_eq!(status.lines, vec!["ERROR db.docs\n\tsource: 22\n\ttarget: 23"]);
    }

    #[test]
    fn shard_count_mismatch_is_structural() {
        let status = checksum_status(
            &record(Side::Source, "docs", &[("s1", "1"), ("s2", "2")]),
            &record(Side::Target, "docs", &[("s1", "1")]),
            false,
        );
        assert_eq!((status.ok, status.errors), (0, 1));
        assert!(status.lines[0].contains("has different number of shards, source: 2, target: 1"));
    }

    #[test]
    fn fetch_error_is_reported_with_counterpart() {
        let mut source = record(Side::Source, "docs", &[]);
        source.shards = vec![ShardChecksum::failed("s1", "timeout")];
        let status = checksum_status(&source, &record(Side::Target, "docs", &[("s1", "5")]), false);
        assert_eq!(status.lines, vec!["ERROR db.docs\n\tsource: timeout\n\ttarget: 5"]);
    }

    #[test]
    fn same_side_is_an_error() {
        let a = record(Side::Source, "docs", &[]);
        assert_eq!(checksum_status(&a, &a, false).errors, 1);
    }

    #[test]
    fn reconciler_reports_one_sided_collections() {
        let mut reconciler = Reconciler::new(false);
        assert!(!reconciler.accept(record(Side::Source, "docs", &[("s1", "1")])));
        assert!(!reconciler.accept(record(Side::Source, "ghost", &[("s2", "1")])));
        assert!(reconciler.accept(record(Side::Target, "docs", &[("s9", "1")])));
        assert_eq!(reconciler.ok(), 1);

        let report = reconciler.finish();
        assert_eq!(report.errors, 1);
        assert_eq!(
            report.lines,
            vec!["ERROR the collection 'db.ghost' does not exist on the target data center"]
        );
        assert_eq!(report.summary(), "OK: 1, errors: 1");
    }
}
