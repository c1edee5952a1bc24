use super::{SMART_LINKS, SMART_VERTICES};
use async_trait::async_trait;
use connectors::api::DatabaseApi;
use engine_config::settings::graph::SmartGraphSettings;
use engine_core::{
    error::WorkloadError,
    random::RandomSource,
    workload::{CALL_TIMEOUT, WorkerContext, Workload, per_second, stamp},
    writer::BatchWriter,
};
use model::documents::{Link, Vertex};
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// Documents per bulk write.
const BATCH: usize = 3000;

/// A random vertex of `1..=vertices` in the component of `i`: its lowest set
/// bit equals the lowest set bit of `i`.
pub fn partner(i: u64, vertices: u64, random: &mut RandomSource) -> u64 {
    let low = 1u64 << i.trailing_zeros();
    ((random.below(vertices) + 1) & !(low - 1)) | low
}

/// Writes one part of the connected components graph per job.
pub struct SmartGraphParts {
    db: Arc<dyn DatabaseApi>,
    settings: SmartGraphSettings,
}

impl SmartGraphParts {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: SmartGraphSettings) -> Self {
        Self { db, settings }
    }

    fn link(&self, part: &str, from: u64, to: u64, random: &mut RandomSource) -> Result<Value, WorkloadError> {
        Ok(serde_json::to_value(Link {
            from: format!("{SMART_VERTICES}/{part}:K{from}"),
            to: format!("{SMART_VERTICES}/{part}:K{to}"),
            payload: random.string(self.settings.edge_payload),
        })?)
    }
}

#[async_trait]
impl Workload for SmartGraphParts {
    fn name(&self) -> &'static str {
        "create smartgraph"
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn jobs(&self) -> u64 {
        self.settings.number_of_parts
    }

    fn start_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn run_worker(&self, mut ctx: WorkerContext) -> Result<(), WorkloadError> {
        let part = ctx.id.to_string();
        let n = self.settings.vertices_per_part();
        let vertices = BatchWriter::new(self.db.clone(), SMART_VERTICES, ctx.metrics.clone())
            .with_timeout(CALL_TIMEOUT);
        let links = BatchWriter::new(self.db.clone(), SMART_LINKS, ctx.metrics.clone())
            .with_timeout(CALL_TIMEOUT);

        let mut batch = Vec::with_capacity(BATCH);
        for i in 1..=n {
            batch.push(serde_json::to_value(Vertex {
                key: format!("{part}:K{i}"),
                smart_part: part.clone(),
                payload: ctx.random.string(self.settings.vertex_payload),
            })?);
            if batch.len() >= BATCH || i == n {
                vertices.write_batch(&batch).await?;
                batch.clear();
                ctx.progress
                    .line(format!("{} Have imported {i} vertices for part {part}.", stamp()))
                    .await;
            }
        }

        // Two partners per vertex, linked both ways.
        for i in 1..=n {
            for _ in 0..2 {
                let j = partner(i, n, &mut ctx.random);
                batch.push(self.link(&part, i, j, &mut ctx.random)?);
                batch.push(self.link(&part, j, i, &mut ctx.random)?);
            }
            if batch.len() >= BATCH || i == n {
                links.write_batch(&batch).await?;
                batch.clear();
                ctx.progress
                    .line(format!("{} Have imported {} links for part {part}.", stamp(), 4 * i))
                    .await;
            }
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let vertices = self.settings.number_of_parts * self.settings.vertices_per_part();
        format!(
            "Total number of vertices written: {vertices}, links: {}, total time: {elapsed:?}, vertices per second: {:.6}",
            4 * vertices,
            per_second(vertices, elapsed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{driver::WorkloadDriver, setup};
    use connectors::{api::ClusterApi, memory::MemoryCluster};
    use engine_core::progress::ProgressSender;

    #[test]
    fn partner_shares_lowest_set_bit() {
        let mut random = RandomSource::new(5);
        for i in 1..=64u64 {
            for _ in 0..20 {
                let j = partner(i, 64, &mut random);
                assert_eq!(j.trailing_zeros(), i.trailing_zeros(), "i={i} j={j}");
            }
        }
    }

    #[tokio::test]
    async fn every_part_gets_vertices_and_links() {
        let cluster = MemoryCluster::new();
        let settings = SmartGraphSettings {
            number_of_parts: 2,
            log2_vertices: 3,
            parallelism: 2,
            ..Default::default()
        };
        let db = cluster.database("_system");
        setup::ensure_graph(
            db.as_ref(),
            &setup::smart_graph(settings.shards),
            false,
            &ProgressSender::disabled(),
        )
        .await
        .unwrap();

        let report = WorkloadDriver::new(ProgressSender::disabled(), 3)
            .run(Arc::new(SmartGraphParts::new(db.clone(), settings)))
            .await
            .unwrap();

        assert_eq!(report.jobs, 2);
        assert_eq!(db.count("vertices").await.unwrap(), 16);
        assert_eq!(db.count("links").await.unwrap(), 64);
        assert_eq!(cluster.bulk_calls("_system", "links").await, vec![32, 32]);
        let vertex = db
            .read_document("vertices", "2:K8", &Default::default())
            .await
            .unwrap();
        assert_eq!(vertex["smartPart"], "2");
    }
}
