use super::{
    error::SettingsError,
    validator::{SettingsValidator, Validate},
};
use std::path::PathBuf;

pub const SYSTEM_DATABASE: &str = "_system";

/// Plain collection setup (`create edgecol`, `graphcols`, `batchimport`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSettings {
    pub database: String,
    pub name: String,
    pub number_of_shards: u32,
    pub replication_factor: u32,
    pub drop: bool,
}

impl CollectionSettings {
    pub fn edgecol() -> Self {
        Self {
            database: SYSTEM_DATABASE.to_string(),
            name: "edges".to_string(),
            number_of_shards: 42,
            replication_factor: 3,
            drop: false,
        }
    }

    /// Shard settings shared by `instances` and `steps`.
    pub fn graphcols() -> Self {
        Self {
            database: SYSTEM_DATABASE.to_string(),
            name: "instances".to_string(),
            number_of_shards: 42,
            replication_factor: 3,
            drop: false,
        }
    }

    pub fn batchimport() -> Self {
        Self {
            database: SYSTEM_DATABASE.to_string(),
            name: "batchimport".to_string(),
            number_of_shards: 1,
            replication_factor: 3,
            drop: false,
        }
    }
}

impl Validate for CollectionSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .non_empty("database", &self.database)
            .non_empty("collection", &self.name)
            .positive("number of shards", self.number_of_shards as u64)
            .positive("replication factor", self.replication_factor as u64)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillSource {
    /// `count` documents sharing `size` bytes between them.
    EqualLength { count: u64, size: u64 },
    /// Whitespace separated `count size` pairs.
    File(PathBuf),
    /// Batch import documents for sequence numbers
    /// `first_seq..first_seq + count`; reruns leave existing keys alone.
    Keyed {
        first_seq: u64,
        count: u64,
        payload_size: usize,
        with_geo: bool,
        words: usize,
    },
}

/// `create collection`: fill a collection to a target size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillCollectionSettings {
    pub database: String,
    pub collection: String,
    pub shards: u32,
    pub source: FillSource,
}

impl FillCollectionSettings {
    pub fn new(source: FillSource) -> Self {
        Self {
            database: SYSTEM_DATABASE.to_string(),
            collection: "test".to_string(),
            shards: 1,
            source,
        }
    }
}

impl Validate for FillCollectionSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        let mut validator = SettingsValidator::new();
        validator
            .non_empty("database", &self.database)
            .non_empty("collection", &self.collection)
            .positive("shards", self.shards as u64);
        match &self.source {
            FillSource::EqualLength { count, size } => {
                validator.positive("count", *count).positive("size", *size);
            }
            FillSource::File(path) => {
                validator.check(!path.as_os_str().is_empty(), "file must be given");
            }
            FillSource::Keyed { count, .. } => {
                validator.positive("count", *count);
            }
        }
        validator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_tool_defaults() {
        let edges = CollectionSettings::edgecol();
        assert_eq!((edges.number_of_shards, edges.replication_factor), (42, 3));
        let batch = CollectionSettings::batchimport();
        assert_eq!((batch.number_of_shards, batch.replication_factor), (1, 3));
        assert!(edges.validate().is_ok());
    }

    #[test]
    fn zero_count_is_rejected() {
        let settings = FillCollectionSettings::new(FillSource::EqualLength { count: 0, size: 10 });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let settings = FillCollectionSettings::new(FillSource::File(PathBuf::new()));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn keyed_fill_needs_documents() {
        let keyed = |count| {
            FillCollectionSettings::new(FillSource::Keyed {
                first_seq: 0,
                count,
                payload_size: 0,
                with_geo: false,
                words: 0,
            })
        };
        assert!(keyed(0).validate().is_err());
        assert!(keyed(3).validate().is_ok());
    }
}
