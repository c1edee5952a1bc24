use crate::{error::WorkloadError, metrics::Metrics};
use connectors::api::{DatabaseApi, ReadOptions};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Point reads against one collection.
#[derive(Clone)]
pub struct DocumentReader {
    db: Arc<dyn DatabaseApi>,
    collection: String,
    options: ReadOptions,
    metrics: Metrics,
}

impl DocumentReader {
    pub fn new(db: Arc<dyn DatabaseApi>, collection: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            db,
            collection: collection.into(),
            options: ReadOptions::default(),
            metrics,
        }
    }

    /// Let followers answer the reads.
    pub fn from_followers(mut self, allow: bool) -> Self {
        self.options.allow_dirty_read = allow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Reads one document and returns the round trip time.
    pub async fn read(&self, key: &str) -> Result<Duration, WorkloadError> {
        let start = Instant::now();
        match self.db.read_document(&self.collection, key, &self.options).await {
            Ok(_) => {
                self.metrics.increment_operations(1);
                self.metrics.increment_documents(1);
                Ok(start.elapsed())
            }
            Err(source) => {
                self.metrics.increment_failures(1);
                Err(WorkloadError::Read {
                    collection: self.collection.clone(),
                    key: key.to_string(),
                    source,
                })
            }
        }
    }
}
