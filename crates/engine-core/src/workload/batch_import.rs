use super::{CALL_TIMEOUT, WorkerContext, Workload, per_second, stamp};
use crate::{
    error::WorkloadError,
    keys::sequence,
    source::KeyedDocuments,
    stats::summarize,
    writer::{BatchWriter, WriteMode},
};
use async_trait::async_trait;
use connectors::api::DatabaseApi;
use engine_config::settings::workload::WriteBatchesSettings;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;

/// Batches between two progress lines.
const REPORT_EVERY: u64 = 100;

/// `write batchimport`: deterministic keys, so reruns skip what exists.
pub struct WriteBatches {
    db: Arc<dyn DatabaseApi>,
    settings: WriteBatchesSettings,
}

impl WriteBatches {
    pub fn new(db: Arc<dyn DatabaseApi>, settings: WriteBatchesSettings) -> Self {
        Self { db, settings }
    }
}

#[async_trait]
impl Workload for WriteBatches {
    fn name(&self) -> &'static str {
        "write batchimport"
    }

    fn parallelism(&self) -> usize {
        self.settings.parallelism
    }

    fn start_delay(&self) -> Duration {
        self.settings.start_delay
    }

    async fn run_worker(&self, ctx: WorkerContext) -> Result<(), WorkloadError> {
        let settings = &self.settings;
        let batches = settings.number;
        let batch_size = settings.batch_size as u64;
        let writer = BatchWriter::new(self.db.clone(), &settings.collection, ctx.metrics.clone())
            .with_mode(WriteMode::Create {
                overwrite_ignore: true,
            })
            .with_timeout(CALL_TIMEOUT);
        let mut generator = KeyedDocuments::new(
            sequence(ctx.id, batches, batch_size, 1, 1),
            batches * batch_size,
            settings.payload_size,
            settings.with_geo,
            settings.with_words,
            ctx.random,
        );
        debug!(worker = ctx.id, first_seq = generator.first_seq, "Writing batches");

        let mut times = Vec::with_capacity(batches as usize);
        let cycle_start = Instant::now();
        let mut last_hundred = cycle_start;
        for i in 1..=batches {
            let docs = (1..=batch_size)
                .map(|j| serde_json::to_value(generator.document(sequence(ctx.id, batches, batch_size, i, j))))
                .collect::<Result<Vec<_>, _>>()?;
            times.push(writer.write_batch(&docs).await?);

            if i % REPORT_EVERY == 0 {
                ctx.progress
                    .line(format!(
                        "{} Have imported {i} batches for id {}, last {REPORT_EVERY} took {:.6} seconds.",
                        stamp(),
                        ctx.id,
                        last_hundred.elapsed().as_secs_f64()
                    ))
                    .await;
                last_hundred = Instant::now();
            }
        }

        if let Some(summary) = summarize(&mut times) {
            let docs_per_sec = per_second(batches * batch_size, cycle_start.elapsed());
            ctx.progress
                .line(format!(
                    "Times for {batches} batches (per batch): {summary}, docs per second in this worker: {docs_per_sec:.6}"
                ))
                .await;
        }
        Ok(())
    }

    fn total_line(&self, elapsed: Duration) -> String {
        let batches = self.settings.parallelism as u64 * self.settings.number;
        let docs = self.settings.total_documents();
        format!(
            "Total number of documents written: {docs}, total time: {elapsed:?}, total batches per second: {:.6}, total docs per second: {:.6}",
            per_second(batches, elapsed),
            per_second(docs, elapsed)
        )
    }
}
