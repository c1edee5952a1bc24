use super::{CALL_TIMEOUT, WorkerContext, Workload, per_second, stamp};
use crate::{error::WorkloadError, keys::document_key, reader::DocumentReader, stats::summarize};
use async_trait::async_trait;
use connectors::api::DatabaseApi;
use engine_config::settings::workload::ReadBatchesSettings;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

const REPORT_EVERY: u64 = 100_000;

/// `read batchimport`: random point reads of keys written by `write batchimport`.
pub struct ReadBatches {
    db: Arc<dyn DatabaseApi>,
    settings: ReadBatchesSettings,
}

impl ReadBatches {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: ReadBatchesSettings) -> Self {
        Self { db, settings }
    }
}

#[async_trait]
impl Workload for ReadBatches {
    fn name(&self) -> &'static str {
        "read batchimport"
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn start_delay(&self) -> Duration {
        self.settings.start_delay
    }

    async fn run_worker(&self, mut ctx: WorkerContext) -> Result<(), WorkloadError> {
        let number = self.settings.number;
        let reader = DocumentReader::new(self.db.clone(), &self.settings.collection, ctx.metrics.clone())
            .from_followers(self.settings.read_from_follower)
            .with_timeout(CALL_TIMEOUT);

        let mut times = Vec::with_capacity(number as usize);
        let cycle_start = Instant::now();
        let mut window_start = cycle_start;
        for i in 1..=number {
            let which = ctx.random.below(self.settings.total_number);
            times.push(reader.read(&document_key(which)).await?);

            if i % REPORT_EVERY == 0 {
                ctx.progress
                    .line(format!(
                        "{} Have read {i} docs for id {}, last {REPORT_EVERY} took {:.6} seconds.",
                        stamp(),
                        ctx.id,
                        window_start.elapsed().as_secs_f64()
                    ))
                    .await;
                window_start = Instant::now();
            }
        }

        if let Some(summary) = summarize(&mut times) {
            let docs_per_sec = per_second(number, cycle_start.elapsed());
            ctx.progress
                .line(format!(
                    "Times for reading {number} docs: {summary}, docs per second in this worker: {docs_per_sec:.6}"
                ))
                .await;
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let docs = self.settings.parallelism as u64 * self.settings.number;
        format!(
            "Total number of documents read: {docs}, total time: {elapsed:?}, total docs per second: {:.6}",
            per_second(docs, elapsed)
        )
    }
}
