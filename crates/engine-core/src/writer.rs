use crate::{error::WorkloadError, metrics::Metrics};
use connectors::api::{DatabaseApi, WriteOptions};
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// How a batch reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Bulk create; with `overwrite_ignore` existing keys are kept.
    Create { overwrite_ignore: bool },
    /// Bulk import endpoint.
    Import,
    /// Bulk create inside a stream transaction that is committed per batch.
    Transactional,
}

#[derive(Debug, Default)]
pub struct WriteSummary {
    pub batches: u64,
    pub documents: u64,
    pub latencies: Vec<Duration>,
}

/// Writes batches of documents into one collection.
#[derive(Clone)]
pub struct BatchWriter {
    db: Arc<dyn DatabaseApi>,
    collection: String,
    mode: WriteMode,
    timeout: Option<Duration>,
    metrics: Metrics,
}

impl BatchWriter {
    pub fn new(db: Arc<dyn DatabaseApi>, collection: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            db,
            collection: collection.into(),
            mode: WriteMode::Create {
                overwrite_ignore: false,
            },
            timeout: None,
            metrics,
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn options(&self) -> WriteOptions {
        let mut options = match self.mode {
            WriteMode::Create {
                overwrite_ignore: true,
            } => WriteOptions::ignore_existing(),
            _ => WriteOptions::default(),
        };
        options.timeout = self.timeout;
        options
    }

    /// Writes one batch and returns how long the server round trip took.
    pub async fn write_batch(&self, docs: &[Value]) -> Result<Duration, WorkloadError> {
        let start = Instant::now();
        let result = match self.mode {
            WriteMode::Create { .. } => self
                .db
                .create_documents(&self.collection, docs, &self.options())
                .await
                .map_err(|source| self.write_error(source)),
            WriteMode::Import => self
                .db
                .import_documents(&self.collection, docs, &self.options())
                .await
                .map_err(|source| self.write_error(source)),
            WriteMode::Transactional => self.write_in_transaction(docs).await,
        };

        match result {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.metrics.increment_operations(1);
                self.metrics.increment_documents(docs.len() as u64);
                Ok(elapsed)
            }
            Err(err) => {
                self.metrics.increment_failures(1);
                Err(err)
            }
        }
    }

    async fn write_in_transaction(&self, docs: &[Value]) -> Result<(), WorkloadError> {
        let id = self
            .db
            .begin_transaction(&[self.collection.as_str()])
            .await
            .map_err(|source| self.trx_error("begin", source))?;
        debug!(trx = %id, collection = %self.collection, "Transaction started");

        let options = self.options().in_transaction(id.clone());
        if let Err(source) = self
            .db
            .create_documents(&self.collection, docs, &options)
            .await
        {
            if let Err(abort) = self.db.abort_transaction(&id).await {
                warn!(trx = %id, error = %abort, "Failed to abort transaction");
            }
            return Err(self.trx_error("write", source));
        }

        self.db
            .commit_transaction(&id)
            .await
            .map_err(|source| self.trx_error("commit", source))
    }

    /// Writes `total` documents in batches of `batch_size`, the last one
    /// possibly short. `make` receives the 0-based index of each document.
    pub async fn write_all<F>(
        &self,
        total: u64,
        batch_size: u64,
        mut make: F,
    ) -> Result<WriteSummary, WorkloadError>
    where
        F: FnMut(u64) -> Result<Value, WorkloadError>,
    {
        let batch_size = batch_size.max(1);
        let mut summary = WriteSummary::default();
        let mut next = 0;
        while next < total {
            let end = (next + batch_size).min(total);
            let docs = (next..end).map(&mut make).collect::<Result<Vec<_>, _>>()?;
            let took = self.write_batch(&docs).await?;
            summary.batches += 1;
            summary.documents += docs.len() as u64;
            summary.latencies.push(took);
            next = end;
        }
        Ok(summary)
    }

    fn write_error(&self, source: connectors::error::ClientError) -> WorkloadError {
        WorkloadError::Write {
            collection: self.collection.clone(),
            source,
        }
    }

    fn trx_error(
        &self,
        stage: &'static str,
        source: connectors::error::ClientError,
    ) -> WorkloadError {
        WorkloadError::Transaction {
            collection: self.collection.clone(),
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{
        api::{ClusterApi, CollectionOptions},
        memory::MemoryCluster,
    };
    use serde_json::json;

    async fn setup(collection: &str) -> (MemoryCluster, Arc<dyn DatabaseApi>) {
        let cluster = MemoryCluster::new();
        cluster
            .add_collection("_system", collection, CollectionOptions::default())
            .await
            .unwrap();
        let db = cluster.database("_system");
        (cluster, db)
    }

    #[tokio::test]
    async fn write_all_issues_ceil_batches() {
        let (cluster, db) = setup("c").await;
        let metrics = Metrics::new();
        let writer = BatchWriter::new(db, "c", metrics.clone());

        let summary = writer
            .write_all(2500, 1000, |i| Ok(json!({ "_key": i.to_string() })))
            .await
            .unwrap();

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.documents, 2500);
        assert_eq!(cluster.bulk_calls("_system", "c").await, vec![1000, 1000, 500]);
        assert_eq!(metrics.snapshot().documents, 2500);
    }

    #[tokio::test]
    async fn failing_batch_stops_the_writer() {
        let (cluster, db) = setup("c").await;
        cluster.fail_bulk_call("c", 2).await;
        let metrics = Metrics::new();
        let writer = BatchWriter::new(db, "c", metrics.clone()).with_mode(WriteMode::Import);

        let err = writer
            .write_all(30, 10, |i| Ok(json!({ "_key": i.to_string() })))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkloadError::Write { .. }));
        assert_eq!(cluster.bulk_calls("_system", "c").await.len(), 2);
        assert_eq!(metrics.snapshot().failures, 1);
        assert_eq!(metrics.snapshot().documents, 10);
    }

    #[tokio::test]
    async fn transactional_batch_commits() {
        let (cluster, db) = setup("edges").await;
        let writer = BatchWriter::new(db, "edges", Metrics::new()).with_mode(WriteMode::Transactional);

        writer
            .write_batch(&[json!({ "_key": "a" }), json!({ "_key": "b" })])
            .await
            .unwrap();

        assert_eq!(cluster.documents("_system", "edges").await.len(), 2);
        assert_eq!(cluster.open_transactions().await, 0);
    }

    #[tokio::test]
    async fn failed_transactional_batch_is_aborted() {
        let (cluster, db) = setup("edges").await;
        cluster.fail_bulk_call("edges", 1).await;
        let writer = BatchWriter::new(db, "edges", Metrics::new()).with_mode(WriteMode::Transactional);

        let err = writer.write_batch(&[json!({ "_key": "a" })]).await.unwrap_err();

        assert!(matches!(
            err,
            WorkloadError::Transaction { stage: "write", .. }
        ));
        assert_eq!(cluster.open_transactions().await, 0);
        assert!(cluster.documents("_system", "edges").await.is_empty());
    }
}
