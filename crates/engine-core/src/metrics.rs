use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    operations: AtomicU64,
    documents: AtomicU64,
    bytes_sent: AtomicU64,
    failures: AtomicU64,
    violations: AtomicU64,
}

/// Counters shared by all workers of one run.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Remote calls that succeeded (bulk writes, reads, queries).
    pub operations: u64,
    pub documents: u64,
    pub bytes_sent: u64,
    pub failures: u64,
    /// Results that contradicted the generated data set.
    pub violations: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_operations(&self, count: u64) {
        self.inner.operations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_documents(&self, count: u64) {
        self.inner.documents.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_violations(&self, count: u64) {
        self.inner.violations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self.inner.operations.load(Ordering::Relaxed),
            documents: self.inner.documents.load(Ordering::Relaxed),
            bytes_sent: self.inner.bytes_sent.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            violations: self.inner.violations.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
