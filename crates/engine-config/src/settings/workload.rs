use super::{
    error::SettingsError,
    validator::{SettingsValidator, Validate},
};
use std::time::Duration;

pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(5);
pub const DEFAULT_NUMBER: u64 = 1_000_000;
pub const BATCH_IMPORT_COLLECTION: &str = "batchimport";

/// Number of edges in one import call of the edge workload.
pub const EDGE_BATCH_SIZE: u64 = 1000;

/// `write batchimport`: per worker `number` batches of `batch_size` documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatchesSettings {
    pub parallelism: usize,
    pub number: u64,
    pub start_delay: Duration,
    pub payload_size: usize,
    pub batch_size: usize,
    pub collection: String,
    pub with_geo: bool,
    pub with_words: usize,
}

impl Default for WriteBatchesSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            number: DEFAULT_NUMBER,
            start_delay: DEFAULT_START_DELAY,
            payload_size: 10,
            batch_size: 10_000,
            collection: BATCH_IMPORT_COLLECTION.to_string(),
            with_geo: true,
            with_words: 5,
        }
    }
}

impl WriteBatchesSettings {
    pub fn total_documents(&self) -> u64 {
        self.parallelism as u64 * self.number * self.batch_size as u64
    }
}

impl Validate for WriteBatchesSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .positive("parallelism", self.parallelism as u64)
            .positive("number", self.number)
            .positive("batch size", self.batch_size as u64)
            .non_empty("collection", &self.collection)
            .warn_if(
                self.batch_size > 100_000,
                "Batch size is very large, requests may be rejected",
            )
            .finish()
    }
}

/// `read batchimport`: per worker `number` random point reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBatchesSettings {
    pub parallelism: usize,
    pub number: u64,
    pub total_number: u64,
    pub start_delay: Duration,
    pub collection: String,
    pub read_from_follower: bool,
}

impl Default for ReadBatchesSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            number: DEFAULT_NUMBER,
            total_number: DEFAULT_NUMBER,
            start_delay: DEFAULT_START_DELAY,
            collection: BATCH_IMPORT_COLLECTION.to_string(),
            read_from_follower: false,
        }
    }
}

impl Validate for ReadBatchesSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .positive("parallelism", self.parallelism as u64)
            .positive("number", self.number)
            .positive("total number", self.total_number)
            .non_empty("collection", &self.collection)
            .finish()
    }
}

/// `write edges`: per worker `number / 1000` imports of 1000 edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEdgesSettings {
    pub parallelism: usize,
    pub number: u64,
    pub start_delay: Duration,
    /// Wrap every batch in a stream transaction.
    pub transactional: bool,
}

impl Default for WriteEdgesSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            number: DEFAULT_NUMBER,
            start_delay: DEFAULT_START_DELAY,
            transactional: false,
        }
    }
}

impl WriteEdgesSettings {
    pub fn batches_per_worker(&self) -> u64 {
        self.number / EDGE_BATCH_SIZE
    }
}

impl Validate for WriteEdgesSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .positive("parallelism", self.parallelism as u64)
            .positive("number", self.number)
            .warn_if(
                self.number < EDGE_BATCH_SIZE,
                "Fewer edges than one batch requested, nothing will be written",
            )
            .finish()
    }
}

/// `write graph`: per worker `number` single document operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteGraphSettings {
    pub parallelism: usize,
    pub number: u64,
    pub start_delay: Duration,
    /// Latency samples per reported window.
    pub window: usize,
}

impl Default for WriteGraphSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            number: DEFAULT_NUMBER,
            start_delay: DEFAULT_START_DELAY,
            window: 10_000,
        }
    }
}

impl Validate for WriteGraphSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .positive("parallelism", self.parallelism as u64)
            .positive("number", self.number)
            .positive("window", self.window as u64)
            .finish()
    }
}
