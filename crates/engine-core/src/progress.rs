use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

/// What workers tell the reporter. The reporter is the only writer of stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        worker: String,
    },
    Finished {
        worker: String,
        error: Option<String>,
    },
    /// A complete line, printed as is.
    Line(String),
    /// Running count of a collection being filled, rewritten in place
    /// until the expected count is reached.
    Fill {
        collection: String,
        count: u64,
        expected: Option<u64>,
    },
    /// Running tally of a checksum comparison, rewritten in place.
    Tally {
        ok: u64,
        errors: u64,
    },
    /// A result that contradicts the generated data set.
    Violation(String),
}

impl ProgressEvent {
    pub fn line(text: impl Into<String>) -> Self {
        ProgressEvent::Line(text.into())
    }

    /// Whether the event overwrites the current terminal line.
    pub fn in_place(&self) -> bool {
        match self {
            ProgressEvent::Fill {
                count, expected, ..
            } => expected.is_none_or(|expected| *count != expected),
            ProgressEvent::Tally { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Started { worker } => write!(f, "Worker {worker} started"),
            ProgressEvent::Finished {
                worker,
                error: None,
            } => write!(f, "Worker {worker} finished"),
            ProgressEvent::Finished {
                worker,
                error: Some(error),
            } => write!(f, "Worker {worker} failed: {error}"),
            ProgressEvent::Line(text) | ProgressEvent::Violation(text) => f.write_str(text),
            ProgressEvent::Fill {
                collection,
                count,
                expected: Some(expected),
            } => write!(f, "{collection} Count: {count}/{expected}"),
            ProgressEvent::Fill {
                collection, count, ..
            } => write!(f, "{collection} Count: {count}"),
            ProgressEvent::Tally { ok, errors } => write!(f, "Progress OK: {ok}, errors: {errors}"),
        }
    }
}

/// Cloneable handle workers use to publish progress.
///
/// Sending never fails: once the reporter is gone events are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sender that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub async fn send(&self, event: ProgressEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(err) = tx.send(event).await {
            trace!(event = %err.0, "Reporter gone, progress dropped");
        }
    }

    pub async fn line(&self, text: impl Into<String>) {
        self.send(ProgressEvent::line(text)).await;
    }
}

/// Bounded progress channel; a slow terminal slows the workers down.
pub fn channel(capacity: usize) -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (progress, mut rx) = channel(8);
        progress.line("first").await;
        progress
            .send(ProgressEvent::Fill {
                collection: "_system.test".into(),
                count: 5,
                expected: Some(10),
            })
            .await;
        drop(progress);

        assert_eq!(rx.recv().await, Some(ProgressEvent::line("first")));
        let fill = rx.recv().await.unwrap();
        assert!(fill.in_place());
        assert_eq!(fill.to_string(), "_system.test Count: 5/10");
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn closed_or_disabled_senders_are_silent() {
        let (progress, rx) = channel(1);
        drop(rx);
        progress.line("nobody listens").await;
        ProgressSender::disabled().line("nothing").await;
    }

    #[test]
    fn completed_fill_ends_the_line() {
        let done = ProgressEvent::Fill {
            collection: "db.c".into(),
            count: 10,
            expected: Some(10),
        };
        assert!(!done.in_place());

        let unknown = ProgressEvent::Fill {
            collection: "db.c".into(),
            count: 10,
            expected: None,
        };
        assert!(unknown.in_place());
        assert_eq!(unknown.to_string(), "db.c Count: 10");
        assert!(ProgressEvent::Tally { ok: 1, errors: 0 }.in_place());
    }
}
