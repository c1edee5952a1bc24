use super::{CALL_TIMEOUT, WorkerContext, Workload, per_second, stamp};
use crate::{
    error::WorkloadError,
    random::RandomSource,
    stats::LatencyWindow,
    writer::{BatchWriter, WriteMode},
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use connectors::api::DatabaseApi;
use engine_config::settings::workload::{EDGE_BATCH_SIZE, WriteEdgesSettings};
use model::documents::Edge;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

pub const EDGE_COLLECTION: &str = "edges";

const USERS: u64 = 10_000;
const MAX_SCORE: u64 = 10_000_000;
/// Batches per latency window and between progress lines.
const WINDOW: usize = 100;

/// `write edges`: imports of random `pubmed` edges, optionally each batch
/// inside its own stream transaction.
pub struct WriteEdges {
    db: Arc<dyn DatabaseApi>,
    settings: WriteEdgesSettings,
}

impl WriteEdges {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: WriteEdgesSettings) -> Self {
        Self { db, settings }
    }
}

fn random_edge(random: &mut RandomSource) -> Edge {
    let from_uid = random.below(USERS) as u32;
    let to_uid = random.below(USERS) as u32;
    Edge {
        from: format!("pubmed/U{from_uid}"),
        to: format!("pubmed/U{to_uid}"),
        from_uid,
        to_uid,
        score: random.below(MAX_SCORE) as u32,
        last_modified: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

#[async_trait]
impl Workload for WriteEdges {
    fn name(&self) -> &'static str {
        if self.settings.transactional {
            "write edges (transactional)"
        } else {
            "write edges"
        }
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn start_delay(&self) -> Duration {
        self.settings.start_delay
    }

    async fn run_worker(&self, mut ctx: WorkerContext) -> Result<(), WorkloadError> {
        let mode = if self.settings.transactional {
            WriteMode::Transactional
        } else {
            WriteMode::Import
        };
        let writer = BatchWriter::new(self.db.clone(), EDGE_COLLECTION, ctx.metrics.clone())
            .with_mode(mode)
            .with_timeout(CALL_TIMEOUT);
        let label = ctx.label();

        let mut window = LatencyWindow::new(WINDOW);
        for i in 1..=self.settings.batches_per_worker() {
            let edges = (0..EDGE_BATCH_SIZE)
                .map(|_| serde_json::to_value(random_edge(&mut ctx.random)))
                .collect::<Result<Vec<Value>, _>>()?;
            let took = writer.write_batch(&edges).await?;

            if i % WINDOW as u64 == 0 {
                ctx.progress
                    .line(format!(
                        "{} Have imported {} edges for id {label}.",
                        stamp(),
                        i * EDGE_BATCH_SIZE
                    ))
                    .await;
            }
            if let Some(report) = window.record(took) {
                let edges_per_sec = report.throughput(EDGE_BATCH_SIZE);
                ctx.progress
                    .line(format!(
                        "Times for last {} writes (={} edges): {}, edges per second in this worker: {edges_per_sec:.6}",
                        report.summary.count,
                        report.summary.count as u64 * EDGE_BATCH_SIZE,
                        report.summary
                    ))
                    .await;
            }
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let edges = self.settings.parallelism as u64 * self.settings.number;
        format!(
            "Total number of edges written: {edges}, total time: {elapsed:?}, total edges per second: {:.6}",
            per_second(edges, elapsed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::testing;
    use connectors::{
        api::{ClusterApi, CollectionOptions},
        memory::MemoryCluster,
    };

    async fn cluster() -> MemoryCluster {
        let cluster = MemoryCluster::new();
        cluster
            .add_collection("_system", EDGE_COLLECTION, CollectionOptions::edges(1, 1))
            .await
            .unwrap();
        cluster
    }

    #[test]
    fn edges_stay_in_user_range() {
        let mut random = RandomSource::new(9);
        for _ in 0..1000 {
            let edge = random_edge(&mut random);
            assert!(edge.from_uid < 10_000 && edge.to_uid < 10_000);
            assert_eq!(edge.from, format!("pubmed/U{}", edge.from_uid));
            assert!(edge.score < 10_000_000);
            assert!(chrono::DateTime::parse_from_rfc3339(&edge.last_modified).is_ok());
        }
    }

    #[tokio::test]
    async fn imports_full_batches_only() {
        let cluster = cluster().await;
        let settings = WriteEdgesSettings {
            number: 2500,
            ..Default::default()
        };
        let (ctx, _rx) = testing::context(1);
        WriteEdges::new(cluster.database("_system"), settings)
            .run_worker(ctx)
            .await
            .unwrap();

        assert_eq!(cluster.bulk_calls("_system", EDGE_COLLECTION).await, vec![1000, 1000]);
    }

    #[tokio::test]
    async fn transactional_run_leaves_no_open_transaction() {
        let cluster = cluster().await;
        let settings = WriteEdgesSettings {
            number: 3000,
            transactional: true,
            ..Default::default()
        };
        let (ctx, _rx) = testing::context(1);
        WriteEdges::new(cluster.database("_system"), settings)
            .run_worker(ctx)
            .await
            .unwrap();

        assert_eq!(cluster.documents("_system", EDGE_COLLECTION).await.len(), 3000);
        assert_eq!(cluster.open_transactions().await, 0);
    }

    #[tokio::test]
    async fn window_line_after_hundred_batches() {
        let cluster = cluster().await;
        let settings = WriteEdgesSettings {
            number: 100_000,
            ..Default::default()
        };
        let (ctx, mut rx) = testing::context(3);
        WriteEdges::new(cluster.database("_system"), settings)
            .run_worker(ctx)
            .await
            .unwrap();

        let lines = testing::lines(&mut rx);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Have imported 100000 edges for id id_3."));
        assert!(lines[1].starts_with("Times for last 100 writes (=100000 edges):"));
    }
}
