//! Shard checksum comparison between a source and a target cluster.
//!
//! One fetcher per cluster walks the inventory and publishes a record per
//! collection on a shared channel; the engine pairs the records as they come
//! in and keeps a running tally on the progress line.

pub mod fetcher;
pub mod reconciler;
pub mod rules;

pub use fetcher::ChecksumFetcher;
pub use reconciler::{ChecksumReport, Reconciler, Status, checksum_status};

use crate::error::ChecksumError;
use connectors::api::ClusterApi;
use engine_config::settings::checksum::ChecksumSettings;
use engine_core::progress::{ProgressEvent, ProgressSender};
use model::checksum::Side;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::info;

const RECORD_BUFFER: usize = 256;

pub struct ChecksumEngine {
    source: Arc<dyn ClusterApi>,
    target: Arc<dyn ClusterApi>,
    database: Option<String>,
    verbose: bool,
    throttle: usize,
    shard_timeout: Duration,
    cancel: CancellationToken,
    progress: ProgressSender,
}

impl ChecksumEngine {
    pub fn new(
        source: Arc<dyn ClusterApi>,
        target: Arc<dyn ClusterApi>,
        settings: &ChecksumSettings,
        progress: ProgressSender,
    ) -> Self {
        Self {
            source,
            target,
            database: settings.database.clone(),
            verbose: settings.verbose,
            throttle: settings.throttle,
            shard_timeout: settings.shard_timeout,
            cancel: CancellationToken::new(),
            progress,
        }
    }

    /// Stops the run when `token` is cancelled (Ctrl-C).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run(self) -> Result<ChecksumReport, ChecksumError> {
        let scan = self.cancel.child_token();
        let throttle = Arc::new(Semaphore::new(self.throttle.max(1)));
        let (tx, mut rx) = mpsc::channel(RECORD_BUFFER);

        let spawn = |cluster: Arc<dyn ClusterApi>, side: Side| {
            let fetcher = ChecksumFetcher::new(
                cluster,
                side,
                throttle.clone(),
                self.shard_timeout,
                scan.clone(),
            );
            tokio::spawn(fetcher.fetch_all(self.database.clone(), tx.clone()))
        };
        let source = spawn(self.source.clone(), Side::Source);
        let target = spawn(self.target.clone(), Side::Target);
        drop(tx);

        let mut reconciler = Reconciler::new(self.verbose);
        while let Some(record) = rx.recv().await {
            if reconciler.accept(record) {
                self.progress
                    .send(ProgressEvent::Tally {
                        ok: reconciler.ok(),
                        errors: reconciler.errors(),
                    })
                    .await;
            }
        }

        let source = source.await?;
        let target = target.await?;
        source?;
        target?;
        if self.cancel.is_cancelled() {
            return Err(ChecksumError::Cancelled);
        }

        let report = reconciler.finish();
        for line in &report.lines {
            self.progress.line(line.as_str()).await;
        }
        self.progress.line(report.summary()).await;
        info!(ok = report.ok, errors = report.errors, "Checksum comparison finished");
        Ok(report)
    }
}
