//! Fan-out of independent workers.
//!
//! Workers never cancel each other: a failure is logged, counted and turned
//! into one aggregate error after every worker has finished.

use crate::error::DriverError;
use engine_core::{
    metrics::{Metrics, MetricsSnapshot},
    progress::{ProgressEvent, ProgressSender},
    random::RandomSource,
    workload::{WorkerContext, Workload},
};
use futures::future::join_all;
use std::{
    fmt::Display,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Semaphore;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub id: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct PoolOutcome {
    pub total: usize,
    pub failures: Vec<WorkerFailure>,
}

impl PoolOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<(), DriverError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(DriverError::WorkersFailed {
                failed: self.failures.len(),
                total: self.total,
            })
        }
    }
}

/// Runs tasks `1..=count`, at most `throttle` at a time, and waits for all.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    throttle: Arc<Semaphore>,
    start_delay: Duration,
}

impl WorkerPool {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: Arc::new(Semaphore::new(throttle.max(1))),
            start_delay: Duration::ZERO,
        }
    }

    /// Pause between launching two tasks.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub async fn run<F, Fut, E>(&self, count: u64, make: F) -> PoolOutcome
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut handles = Vec::with_capacity(count as usize);
        for id in 1..=count {
            if id > 1 && !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            let throttle = self.throttle.clone();
            let task = make(id);
            handles.push(tokio::spawn(async move {
                let _permit = throttle.acquire_owned().await.map_err(|e| e.to_string())?;
                task.await.map_err(|e| e.to_string())
            }));
        }

        let mut outcome = PoolOutcome {
            total: count as usize,
            failures: Vec::new(),
        };
        for (i, result) in join_all(handles).await.into_iter().enumerate() {
            let id = i as u64 + 1;
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(join) => join.to_string(),
            };
            error!(worker = id, error = %error, "Worker failed");
            outcome.failures.push(WorkerFailure { id, error });
        }
        outcome
    }
}

#[derive(Debug, Clone)]
pub struct DriverReport {
    pub jobs: u64,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

/// Runs every job of a [`Workload`], `parallelism` at a time.
pub struct WorkloadDriver {
    progress: ProgressSender,
    metrics: Metrics,
    seed: u64,
}

impl WorkloadDriver {
    pub fn new(progress: ProgressSender, seed: u64) -> Self {
        Self {
            progress,
            metrics: Metrics::new(),
            seed,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn run(&self, workload: Arc<dyn Workload>) -> Result<DriverReport, DriverError> {
        let workers = workload.parallelism();
        let jobs = workload.jobs();
        info!(workload = workload.name(), workers, jobs, "Starting workload");

        let start = Instant::now();
        let pool = WorkerPool::new(workers).with_start_delay(workload.start_delay());
        let outcome = pool
            .run(jobs, |id| {
                let workload = workload.clone();
                let progress = self.progress.clone();
                let ctx = WorkerContext {
                    id,
                    random: RandomSource::new(self.seed.wrapping_add(id)),
                    progress: self.progress.clone(),
                    metrics: self.metrics.clone(),
                };
                async move {
                    let worker = ctx.id.to_string();
                    progress
                        .send(ProgressEvent::Started {
                            worker: worker.clone(),
                        })
                        .await;
                    let result = workload.run_worker(ctx).await;
                    progress
                        .send(ProgressEvent::Finished {
                            worker,
                            error: result.as_ref().err().map(ToString::to_string),
                        })
                        .await;
                    result
                }
            })
            .await;
        let elapsed = start.elapsed();

        self.progress.line("").await;
        self.progress.line(workload.total_line(elapsed)).await;

        let report = DriverReport {
            jobs,
            elapsed,
            metrics: self.metrics.snapshot(),
        };
        info!(
            workload = workload.name(),
            elapsed = ?report.elapsed,
            documents = report.metrics.documents,
            failures = outcome.failures.len(),
            "Workload finished"
        );
        outcome.into_result().map(|()| report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::{error::WorkloadError, progress};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn pool_respects_throttle() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcome = WorkerPool::new(2)
            .run(6, |_| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.total, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn pool_waits_for_siblings_of_a_failed_task() {
        let finished = Arc::new(AtomicUsize::new(0));

        let outcome = WorkerPool::new(4)
            .run(4, |id| {
                let finished = finished.clone();
                async move {
                    if id == 2 {
                        return Err(format!("worker {id} broke"));
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(
            outcome.failures,
            vec![WorkerFailure {
                id: 2,
                error: "worker 2 broke".into()
            }]
        );
        assert!(matches!(
            outcome.into_result(),
            Err(DriverError::WorkersFailed { failed: 1, total: 4 })
        ));
    }

    struct Counting {
        workers: usize,
        fail: Option<u64>,
        seen: Arc<std::sync::Mutex<Vec<u64>>>,
    }

    #[async_trait]
    impl Workload for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn parallelism(&self) -> usize {
            self.workers
        }

        fn start_delay(&self) -> Duration {
            Duration::from_millis(1)
        }

        async fn run_worker(&self, ctx: WorkerContext) -> Result<(), WorkloadError> {
            self.seen.lock().unwrap().push(ctx.id);
            ctx.metrics.increment_documents(10);
            if self.fail == Some(ctx.id) {
                return Err(WorkloadError::Source(
                    engine_core::error::SourceError::CountZero,
                ));
            }
            Ok(())
        }

        fn total_line(&self, _elapsed: Duration) -> String {
            format!("Total: {}", self.workers * 10)
        }
    }

    #[tokio::test]
    async fn driver_runs_every_identity_and_prints_total() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (progress, mut rx) = progress::channel(64);
        let driver = WorkloadDriver::new(progress, 1);

        let report = driver
            .run(Arc::new(Counting {
                workers: 3,
                fail: None,
                seen: seen.clone(),
            }))
            .await
            .unwrap();

        let mut ids = seen.lock().unwrap().clone();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(report.metrics.documents, 30);

        drop(driver);
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.last(), Some(&ProgressEvent::line("Total: 30")));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::Finished { error: None, .. }))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn driver_aggregates_failures() {
        let driver = WorkloadDriver::new(ProgressSender::disabled(), 1);
        let err = driver
            .run(Arc::new(Counting {
                workers: 3,
                fail: Some(2),
                seen: Default::default(),
            }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "1 of 3 workers failed");
        assert_eq!(driver.metrics().snapshot().documents, 30);
    }
}
