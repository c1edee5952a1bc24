use crate::{
    error::WorkloadError,
    metrics::Metrics,
    progress::{ProgressEvent, ProgressSender},
    source::{DocumentSource, Start},
    writer::{BatchWriter, WriteMode},
};
use connectors::api::DatabaseApi;
use std::sync::Arc;
use tracing::{debug, info};

/// Payload bytes gathered before one bulk write is sent.
pub const CHUNK_BYTES: u64 = 100_000_000;

/// Fills one collection from a [`DocumentSource`], resuming from whatever
/// the collection already holds.
pub struct CollectionCreator {
    db: Arc<dyn DatabaseApi>,
    collection: String,
    source: DocumentSource,
    writer: BatchWriter,
    progress: ProgressSender,
    chunk_bytes: u64,
}

impl CollectionCreator {
    pub fn new(
        db: Arc<dyn DatabaseApi>,
        collection: &str,
        source: DocumentSource,
        metrics: Metrics,
        progress: ProgressSender,
    ) -> Self {
        let overwrite_ignore = matches!(source, DocumentSource::Keyed(_));
        let writer = BatchWriter::new(db.clone(), collection, metrics)
            .with_mode(WriteMode::Create { overwrite_ignore });
        Self {
            db,
            collection: collection.to_string(),
            source,
            writer,
            progress,
            chunk_bytes: CHUNK_BYTES,
        }
    }

    pub fn with_chunk_bytes(mut self, bytes: u64) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }

    /// Runs until the source is exhausted or the expected count is reached.
    /// Returns the final document count.
    pub async fn run(mut self) -> Result<u64, WorkloadError> {
        let mut current = self
            .db
            .count(&self.collection)
            .await
            .map_err(|source| WorkloadError::Count {
                collection: self.collection.clone(),
                source,
            })?;

        let mut expected = match self.source.init(current)? {
            Start::Done => {
                info!(collection = %self.collection, count = current, "Nothing left to write");
                return Ok(current);
            }
            Start::Expected(count) => Some(count),
            Start::Unknown => None,
        };
        debug!(collection = %self.collection, current, ?expected, "Filling collection");

        let label = format!("{}.{}", self.db.name(), self.collection);
        loop {
            let mut docs = Vec::new();
            let mut bytes = 0;
            while let Some(chunk) = self.source.next_chunk(current + docs.len() as u64)? {
                if chunk.docs.is_empty() {
                    break;
                }
                bytes += chunk.bytes;
                docs.extend(chunk.docs);
                if bytes > self.chunk_bytes {
                    break;
                }
            }

            current += docs.len() as u64;
            if !docs.is_empty() {
                self.writer.write_batch(&docs).await?;
            } else if expected.is_none() {
                expected = Some(current);
            }

            self.progress
                .send(ProgressEvent::Fill {
                    collection: label.clone(),
                    count: current,
                    expected,
                })
                .await;

            if docs.is_empty() || Some(current) == expected {
                break;
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        progress,
        random::RandomSource,
        source::{EqualLength, FilePairs, KeyedDocuments},
    };
    use connectors::{
        api::{ClusterApi, CollectionOptions},
        memory::MemoryCluster,
    };
    use serde_json::json;
    use tracing_test::traced_test;

    async fn cluster() -> MemoryCluster {
        let cluster = MemoryCluster::new();
        cluster
            .add_collection("_system", "test", CollectionOptions::default())
            .await
            .unwrap();
        cluster
    }

    #[tokio::test]
    async fn fills_in_chunks_up_to_expected() {
        let cluster = cluster().await;
        let (progress, mut rx) = progress::channel(64);
        let source = DocumentSource::EqualLength(EqualLength::new(10, 100, RandomSource::new(1)));

        let count = CollectionCreator::new(
            cluster.database("_system"),
            "test",
            source,
            Metrics::new(),
            progress,
        )
        .with_chunk_bytes(30)
        .run()
        .await
        .unwrap();

        assert_eq!(count, 10);
        // 10 bytes per document, a chunk closes once it exceeds 30 bytes.
        assert_eq!(cluster.bulk_calls("_system", "test").await, vec![4, 4, 2]);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(ProgressEvent::Fill {
                collection: "_system.test".into(),
                count: 10,
                expected: Some(10),
            })
        );
    }

    #[tokio::test]
    async fn resumes_from_existing_documents() {
        let cluster = cluster().await;
        let db = cluster.database("_system");
        db.create_documents("test", &[json!({"a": "x"}), json!({"a": "y"})], &Default::default())
            .await
            .unwrap();

        let source = DocumentSource::EqualLength(EqualLength::new(5, 50, RandomSource::new(2)));
        let count = CollectionCreator::new(db, "test", source, Metrics::new(), ProgressSender::disabled())
            .run()
            .await
            .unwrap();

        assert_eq!(count, 5);
        assert_eq!(cluster.bulk_calls("_system", "test").await, vec![2, 3]);
    }

    #[tokio::test]
    async fn file_source_learns_expected_at_exhaustion() {
        let cluster = cluster().await;
        let (progress, mut rx) = progress::channel(64);
        let source = DocumentSource::FromFile(FilePairs::from_text("2 3 4 5", RandomSource::new(3)));

        let count = CollectionCreator::new(
            cluster.database("_system"),
            "test",
            source,
            Metrics::new(),
            progress,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(count, 6);
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 2);
        assert!(events[0].in_place());
        assert!(!events[1].in_place());
        assert_eq!(events[1].to_string(), "_system.test Count: 6/6");
    }

    #[tokio::test]
    async fn keyed_source_is_idempotent() {
        let cluster = cluster().await;
        for _ in 0..2 {
            let source = DocumentSource::Keyed(KeyedDocuments::new(
                1,
                4,
                8,
                false,
                0,
                RandomSource::new(4),
            ));
            CollectionCreator::new(
                cluster.database("_system"),
                "test",
                source,
                Metrics::new(),
                ProgressSender::disabled(),
            )
            .run()
            .await
            .unwrap();
        }
        assert_eq!(cluster.documents("_system", "test").await.len(), 4);
    }

    #[traced_test]
    #[tokio::test]
    async fn exhausted_file_writes_nothing() {
        let cluster = cluster().await;
        let db = cluster.database("_system");
        db.create_documents("test", &[json!({"a": "x"}), json!({"a": "y"})], &Default::default())
            .await
            .unwrap();

        let source = DocumentSource::FromFile(FilePairs::from_text("1 5", RandomSource::new(5)));
        let count = CollectionCreator::new(db, "test", source, Metrics::new(), ProgressSender::disabled())
            .run()
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(cluster.bulk_calls("_system", "test").await, vec![2]);
        assert!(logs_contain("Nothing left to write"));
    }
}
