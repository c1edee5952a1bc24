use async_trait::async_trait;
use connectors::api::DatabaseApi;
use engine_config::settings::graph::TenantGraphSettings;
use engine_core::{
    error::WorkloadError,
    workload::{
        CALL_TIMEOUT, WorkerContext, Workload,
        graph::{EDGE_COLLECTION, VERTEX_COLLECTION},
        per_second, stamp,
    },
    writer::BatchWriter,
};
use model::documents::{Instance, Step};
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// Paths per bulk write: 3000 vertices and 2000 edges.
pub const PATHS_PER_BATCH: u64 = 1000;
const VERTEX_PAYLOAD: usize = 1400;
const EDGE_PAYLOAD: usize = 700;

/// Writes the `K -> L -> M` paths of one tenant per job.
pub struct TenantPaths {
    db: Arc<dyn DatabaseApi>,
    settings: TenantGraphSettings,
}

impl TenantPaths {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: TenantGraphSettings) -> Self {
        Self { db, settings }
    }
}

#[async_trait]
impl Workload for TenantPaths {
    fn name(&self) -> &'static str {
        "create graph"
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn jobs(&self) -> u64 {
        self.settings.tenants.tenants()
    }

    fn start_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn run_worker(&self, mut ctx: WorkerContext) -> Result<(), WorkloadError> {
        let tenant = format!("ten{}", self.settings.tenants.first + ctx.id - 1);
        let paths = self.settings.tenants.paths_per_tenant;
        let vertices = BatchWriter::new(self.db.clone(), VERTEX_COLLECTION, ctx.metrics.clone())
            .with_timeout(CALL_TIMEOUT);
        let edges = BatchWriter::new(self.db.clone(), EDGE_COLLECTION, ctx.metrics.clone())
            .with_timeout(CALL_TIMEOUT);

        let mut instances: Vec<Value> = Vec::with_capacity(3 * PATHS_PER_BATCH as usize);
        let mut steps: Vec<Value> = Vec::with_capacity(2 * PATHS_PER_BATCH as usize);
        for i in 1..=paths {
            let key = |label: char| format!("{tenant}:{label}{i}");
            for label in ['K', 'L', 'M'] {
                instances.push(serde_json::to_value(Instance {
                    key: key(label),
                    tenant_id: tenant.clone(),
                    payload: ctx.random.string(VERTEX_PAYLOAD),
                })?);
            }
            for (from, to) in [('K', 'L'), ('L', 'M')] {
                steps.push(serde_json::to_value(Step {
                    key: None,
                    tenant_id: tenant.clone(),
                    from: format!("{VERTEX_COLLECTION}/{}", key(from)),
                    to: format!("{VERTEX_COLLECTION}/{}", key(to)),
                    payload: ctx.random.string(EDGE_PAYLOAD),
                })?);
            }

            if i % PATHS_PER_BATCH == 0 || i == paths {
                vertices.write_batch(&instances).await?;
                edges.write_batch(&steps).await?;
                instances.clear();
                steps.clear();
                ctx.progress
                    .line(format!("{} Have imported {i} paths for tenant {tenant}.", stamp()))
                    .await;
            }
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let paths = self.settings.tenants.tenants() * self.settings.tenants.paths_per_tenant;
        format!(
            "Total number of paths written: {paths}, total time: {elapsed:?}, paths per second: {:.6}",
            per_second(paths, elapsed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{api::ClusterApi, memory::MemoryCluster};
    use engine_config::settings::graph::TenantRange;
    use engine_core::{metrics::Metrics, progress, random::RandomSource};

    fn settings(paths: u64) -> TenantGraphSettings {
        TenantGraphSettings {
            tenants: TenantRange {
                first: 10,
                last: 12,
                paths_per_tenant: paths,
            },
            parallelism: 2,
            drop: false,
        }
    }

    async fn cluster() -> MemoryCluster {
        let cluster = MemoryCluster::new();
        cluster
            .database("_system")
            .create_graph(&crate::setup::tenant_graph())
            .await
            .unwrap();
        cluster
    }

    #[tokio::test]
    async fn one_job_per_tenant() {
        let workload = TenantPaths::new(MemoryCluster::new().database("_system"), settings(1));
        assert_eq!(workload.jobs(), 3);
        assert_eq!(workload.parallelism(), 2);
    }

    #[tokio::test]
    async fn paths_are_written_in_batches() {
        let cluster = cluster().await;
        let workload = TenantPaths::new(cluster.database("_system"), settings(PATHS_PER_BATCH + 1));
        let (tx, mut rx) = progress::channel(16);
        let ctx = WorkerContext {
            id: 2,
            random: RandomSource::new(1),
            progress: tx,
            metrics: Metrics::new(),
        };

        workload.run_worker(ctx).await.unwrap();

        assert_eq!(cluster.bulk_calls("_system", "instances").await, vec![3000, 3]);
        assert_eq!(cluster.bulk_calls("_system", "steps").await, vec![2000, 2]);
        let lines: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.to_string())
            .collect();
        assert!(lines[0].ends_with("Have imported 1000 paths for tenant ten11."));
        assert!(lines[1].ends_with("Have imported 1001 paths for tenant ten11."));

        let step = &cluster.documents("_system", "steps").await[0];
        assert_eq!(step["tenantId"], "ten11");
        assert!(step["_from"].as_str().unwrap().starts_with("instances/ten11:"));
    }
}
