#![allow(dead_code)]

use connectors::{api::ClusterApi, memory::MemoryCluster};
use engine_core::{
    progress::{self, ProgressEvent, ProgressSender},
    workload::Workload,
};
use engine_runtime::{
    actor::{
        MailboxStats,
        reporter::{ProgressReporter, spawn_reporter},
    },
    driver::{DriverReport, WorkloadDriver},
    error::DriverError,
};
use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};
use tokio::task::JoinHandle;

pub const SEED: u64 = 42;

/// Collects every progress event until the last sender is dropped.
pub fn collector() -> (ProgressSender, JoinHandle<Vec<ProgressEvent>>) {
    let (tx, mut rx) = progress::channel(64);
    let handle = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });
    (tx, handle)
}

/// Runs a workload and returns its result with the progress it published.
pub async fn run_workload(
    workload: Arc<dyn Workload>,
    seed: u64,
) -> (Result<DriverReport, DriverError>, Vec<ProgressEvent>) {
    let (progress, events) = collector();
    let result = WorkloadDriver::new(progress, seed).run(workload).await;
    (result, events.await.expect("collector task"))
}

pub fn lines(events: &[ProgressEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Line(_)))
        .map(ToString::to_string)
        .collect()
}

pub async fn assert_count(cluster: &MemoryCluster, db: &str, collection: &str, expected: u64) {
    let count = cluster
        .database(db)
        .count(collection)
        .await
        .expect("count collection");
    assert_eq!(count, expected, "document count of {db}.{collection}");
}

/// Terminal stand-in for the reporter.
#[derive(Clone, Default)]
pub struct Screen(Arc<Mutex<Vec<u8>>>);

impl Screen {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("screen lock")).into_owned()
    }

    pub fn reporter(&self) -> (ProgressSender, JoinHandle<MailboxStats>) {
        spawn_reporter(ProgressReporter::new(self.clone()))
    }
}

impl Write for Screen {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("screen lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
