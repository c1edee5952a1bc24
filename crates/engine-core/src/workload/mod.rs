//! Worker loops of the `write` and `read` commands.
//!
//! A [`Workload`] describes what one worker does; the runtime decides how
//! many run, staggers their start and joins them.

use crate::{error::WorkloadError, metrics::Metrics, progress::ProgressSender, random::RandomSource};
use async_trait::async_trait;
use chrono::Local;
use std::time::Duration;

pub mod batch_import;
pub mod edges;
pub mod graph;
pub mod read;

pub use batch_import::WriteBatches;
pub use edges::WriteEdges;
pub use graph::WriteGraph;
pub use read::ReadBatches;

/// Timeout of a single bulk or document call made by a worker.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Everything a worker owns for the duration of its run.
pub struct WorkerContext {
    /// 1-based identity of the worker.
    pub id: u64,
    pub random: RandomSource,
    pub progress: ProgressSender,
    pub metrics: Metrics,
}

impl WorkerContext {
    /// Key namespace of the worker, e.g. `id_3`.
    pub fn label(&self) -> String {
        format!("id_{}", self.id)
    }
}

#[async_trait]
pub trait Workload: Send + Sync {
    fn name(&self) -> &'static str;

    /// Workers running at the same time.
    fn parallelism(&self) -> usize;

    /// Worker identities handed out, `1..=jobs`.
    fn jobs(&self) -> u64 {
        self.parallelism() as u64
    }

    fn start_delay(&self) -> Duration;

    async fn run_worker(&self, ctx: WorkerContext) -> Result<(), WorkloadError>;

    /// Closing line once every worker has finished.
    fn total_line(&self, elapsed: Duration) -> String;
}

/// Timestamp prefix of progress lines.
pub fn stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 { 0.0 } else { count as f64 / secs }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::progress::{self, ProgressEvent};
    use tokio::sync::mpsc;

    pub fn context(id: u64) -> (WorkerContext, mpsc::Receiver<ProgressEvent>) {
        let (progress, rx) = progress::channel(100_000);
        let ctx = WorkerContext {
            id,
            random: RandomSource::new(id),
            progress,
            metrics: Metrics::new(),
        };
        (ctx, rx)
    }

    pub fn lines(rx: &mut mpsc::Receiver<ProgressEvent>) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| event.to_string())
            .collect()
    }
}
