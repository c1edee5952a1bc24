use std::{
    fmt,
    time::{Duration, Instant},
};

/// Percentiles of one window of latency samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: usize,
    pub median: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub mean: Duration,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} (median), {:?} (90%ile), {:?} (99%ile), {:?} (average)",
            self.median, self.p90, self.p99, self.mean
        )
    }
}

/// Sorts `samples` in place and picks `N/2`, `9N/10` and `99N/100`.
///
/// Returns `None` for an empty slice.
pub fn summarize(samples: &mut [Duration]) -> Option<LatencySummary> {
    let n = samples.len();
    if n == 0 {
        return None;
    }
    samples.sort_unstable();

    let total: Duration = samples.iter().sum();
    Some(LatencySummary {
        count: n,
        median: samples[n / 2],
        p90: samples[n * 9 / 10],
        p99: samples[n * 99 / 100],
        mean: total / n as u32,
    })
}

/// A full (or final partial) window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub summary: LatencySummary,
    pub elapsed: Duration,
}

impl WindowReport {
    /// Operations per second over the window, given how many operations one
    /// sample stands for (e.g. documents per batch).
    pub fn throughput(&self, ops_per_sample: u64) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.summary.count as u64 * ops_per_sample) as f64 / secs
    }
}

/// Rolling buffer that yields a report every `capacity` samples.
#[derive(Debug)]
pub struct LatencyWindow {
    capacity: usize,
    samples: Vec<Duration>,
    started: Instant,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Vec::with_capacity(capacity),
            started: Instant::now(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn record(&mut self, sample: Duration) -> Option<WindowReport> {
        self.samples.push(sample);
        if self.samples.len() >= self.capacity {
            self.flush()
        } else {
            None
        }
    }

    /// Reports whatever is buffered and starts a new window.
    pub fn flush(&mut self) -> Option<WindowReport> {
        let summary = summarize(&mut self.samples)?;
        let report = WindowReport {
            summary,
            elapsed: self.started.elapsed(),
        };
        self.samples.clear();
        self.started = Instant::now();
        Some(report)
    }
}
