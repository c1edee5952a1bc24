use super::{CALL_TIMEOUT, WorkerContext, Workload, per_second, stamp};
use crate::{error::WorkloadError, random::RandomSource, stats::LatencyWindow};
use async_trait::async_trait;
use connectors::api::{DatabaseApi, WriteOptions};
use engine_config::settings::workload::WriteGraphSettings;
use model::documents::{Instance, Step};
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub const VERTEX_COLLECTION: &str = "instances";
pub const EDGE_COLLECTION: &str = "steps";

const LARGE_PAYLOAD: usize = 1400;
const SMALL_PAYLOAD: usize = 700;
const TENANT_MASK: u64 = 65535;
/// Operations after which replaced keys stop being random.
const RANDOM_PREVIOUS_UNTIL: u64 = 200;
const PREVIOUS_STRIDE: u64 = 47;

/// The four operations a graph worker cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOp {
    InsertVertex,
    InsertEdge,
    ReplaceVertex,
    ReplaceEdge,
}

impl GraphOp {
    pub fn for_index(i: u64) -> Self {
        match i % 4 {
            0 => GraphOp::InsertVertex,
            1 => GraphOp::InsertEdge,
            2 => GraphOp::ReplaceVertex,
            _ => GraphOp::ReplaceEdge,
        }
    }
}

/// Index of the vertex/edge pair replaced after operation `i`.
///
/// Random among the inserted pairs at first, then a fixed stride wrapping
/// around the inserted range.
pub fn next_previous(i: u64, previous: u64, random: &mut RandomSource) -> u64 {
    if i < 4 {
        0
    } else if i < RANDOM_PREVIOUS_UNTIL {
        random.below(i / 4)
    } else {
        let limit = i / 4 - 1;
        let mut next = previous + PREVIOUS_STRIDE;
        while next >= limit {
            next -= limit;
        }
        next
    }
}

/// `write graph`: single document inserts and replaces on `instances` and
/// `steps`.
pub struct WriteGraph {
    db: Arc<dyn DatabaseApi>,
    settings: WriteGraphSettings,
}

impl WriteGraph {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: WriteGraphSettings) -> Self {
        Self { db, settings }
    }

    async fn apply(
        &self,
        op: GraphOp,
        collection: &str,
        key: Option<&str>,
        doc: Value,
    ) -> Result<(), WorkloadError> {
        let options = WriteOptions::default().with_timeout(CALL_TIMEOUT);
        let result = match key {
            Some(key) => {
                self.db
                    .replace_document(collection, key, &doc, &options)
                    .await
            }
            None => self.db.create_document(collection, &doc, &options).await,
        };
        result.map_err(|source| {
            tracing::warn!(?op, collection, error = %source, "Graph operation failed");
            WorkloadError::Write {
                collection: collection.to_string(),
                source,
            }
        })
    }
}

#[async_trait]
impl Workload for WriteGraph {
    fn name(&self) -> &'static str {
        "write graph"
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn start_delay(&self) -> Duration {
        self.settings.start_delay
    }

    async fn run_worker(&self, mut ctx: WorkerContext) -> Result<(), WorkloadError> {
        let id = ctx.label();
        let number = self.settings.number;
        let large = ctx.random.string(LARGE_PAYLOAD);
        let small = ctx.random.string(SMALL_PAYLOAD);

        let mut window = LatencyWindow::new(self.settings.window);
        let mut tenant: u64 = 1;
        let mut previous: u64 = 0;
        for i in 0..number {
            let op = GraphOp::for_index(i);
            let tenant_id = format!("T{tenant}");
            let vertex = format!("I{id}_{}", i / 4);
            let start = Instant::now();
            match op {
                GraphOp::InsertVertex => {
                    let doc = Instance {
                        key: vertex,
                        tenant_id,
                        payload: format!("{i}{large}"),
                    };
                    self.apply(op, VERTEX_COLLECTION, None, serde_json::to_value(doc)?)
                        .await?;
                }
                GraphOp::InsertEdge => {
                    let doc = Step {
                        key: Some(format!("S{id}_{}", i / 4)),
                        tenant_id,
                        from: format!("{VERTEX_COLLECTION}/{vertex}"),
                        to: format!("{VERTEX_COLLECTION}/{vertex}"),
                        payload: format!("{i}{small}"),
                    };
                    self.apply(op, EDGE_COLLECTION, None, serde_json::to_value(doc)?)
                        .await?;
                }
                GraphOp::ReplaceVertex => {
                    let key = format!("I{id}_{previous}");
                    let doc = Instance {
                        key: key.clone(),
                        tenant_id,
                        payload: format!("{i}{large}"),
                    };
                    self.apply(op, VERTEX_COLLECTION, Some(&key), serde_json::to_value(doc)?)
                        .await?;
                }
                GraphOp::ReplaceEdge => {
                    let key = format!("S{id}_{previous}");
                    let doc = Step {
                        key: Some(key.clone()),
                        tenant_id,
                        from: format!("{VERTEX_COLLECTION}/{vertex}"),
                        to: format!("{VERTEX_COLLECTION}/{vertex}"),
                        payload: format!("{i}{large}"),
                    };
                    self.apply(op, EDGE_COLLECTION, Some(&key), serde_json::to_value(doc)?)
                        .await?;
                }
            }
            ctx.metrics.increment_operations(1);
            ctx.metrics.increment_documents(1);

            let report = match window.record(start.elapsed()) {
                Some(report) => Some(report),
                None if i == number - 1 => window.flush(),
                None => None,
            };
            if let Some(report) = report {
                ctx.progress
                    .line(format!("{} Have imported {} paths for id {id}.", stamp(), i + 1))
                    .await;
                ctx.progress
                    .line(format!(
                        "Times for last {} writes: {}, edges per second in this worker: {:.6}",
                        report.summary.count,
                        report.summary,
                        report.throughput(1)
                    ))
                    .await;
            }

            tenant = (tenant + 1) & TENANT_MASK;
            previous = next_previous(i, previous, &mut ctx.random);
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let ops = self.settings.parallelism as u64 * self.settings.number;
        format!(
            "Total number of edges written: {ops}, total time: {elapsed:?}, total edges per second: {:.6}",
            per_second(ops, elapsed)
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
            .add_collection("_system", VERTEX_COLLECTION, CollectionOptions::default())
            .await
            .unwrap();
        cluster
            .add_collection("_system", EDGE_COLLECTION, CollectionOptions::edges(1, 1))
            .await
            .unwrap();
        cluster
    }

    #[test]
    fn operations_cycle() {
        let ops: Vec<_> = (0..5).map(GraphOp::for_index).collect();
        assert_eq!(
            ops,
            vec![
                GraphOp::InsertVertex,
                GraphOp::InsertEdge,
                GraphOp::ReplaceVertex,
                GraphOp::ReplaceEdge,
                GraphOp::InsertVertex
            ]
        );
    }

    #[test]
    fn previous_always_points_at_inserted_pair() {
        let mut random = RandomSource::new(1);
        let mut previous = 0;
        for i in 0..100_000u64 {
            previous = next_previous(i, previous, &mut random);
            // The pair for operation i + 1 is inserted already.
            assert!(previous <= (i + 1) / 4, "i={i} previous={previous}");
        }
    }

    #[tokio::test]
    async fn inserts_and_replaces() {
        let cluster = cluster().await;
        let settings = WriteGraphSettings {
            number: 1000,
            window: 300,
            ..Default::default()
        };
        let (ctx, mut rx) = testing::context(7);
        WriteGraph::new(cluster.database("_system"), settings)
            .run_worker(ctx)
            .await
            .unwrap();

        let vertices = cluster.documents("_system", VERTEX_COLLECTION).await;
        let edges = cluster.documents("_system", EDGE_COLLECTION).await;
        assert_eq!(vertices.len(), 250);
        assert_eq!(edges.len(), 250);
        assert!(vertices.iter().any(|v| v["_key"] == "Iid_7_0"));
        assert_eq!(edges[0]["_from"], edges[0]["_to"]);

        // Three full windows plus the final partial one.
        let lines = testing::lines(&mut rx);
        assert_eq!(lines.len(), 8);
        assert!(lines[6].ends_with("Have imported 1000 paths for id id_7."));
        assert!(lines[7].starts_with("Times for last 100 writes:"));
    }
}
