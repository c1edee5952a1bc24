use crate::{
    actor::{Actor, MailboxStats, spawn_actor},
    error::ActorError,
};
use async_trait::async_trait;
use engine_core::progress::{ProgressEvent, ProgressSender};
use std::io::{self, Write};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MAILBOX: usize = 1024;

/// Sole writer of user facing progress output.
pub struct ProgressReporter {
    out: Box<dyn Write + Send>,
    /// The cursor sits on a line that was written with `\r` and no newline.
    line_open: bool,
    violations: u64,
}

impl ProgressReporter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            line_open: false,
            violations: 0,
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }
}

#[async_trait]
impl Actor<ProgressEvent> for ProgressReporter {
    async fn handle(&mut self, msg: ProgressEvent) -> Result<(), ActorError> {
        match &msg {
            ProgressEvent::Started { worker } => debug!(worker = %worker, "Worker started"),
            ProgressEvent::Violation(message) => {
                self.violations += 1;
                warn!(violations = self.violations, "{message}");
            }
            _ => {}
        }

        if msg.in_place() {
            write!(self.out, "\r{msg}")?;
            self.line_open = true;
        } else if matches!(msg, ProgressEvent::Fill { .. }) {
            writeln!(self.out, "\r{msg}")?;
            self.line_open = false;
        } else {
            self.close_line()?;
            writeln!(self.out, "{msg}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    async fn on_stop(&mut self) -> Result<(), ActorError> {
        self.close_line()?;
        self.out.flush()?;
        debug!(violations = self.violations, "Reporter finished");
        Ok(())
    }
}

/// Starts a reporter and returns the sender workers publish to. The reporter
/// drains and stops once every clone of the sender is dropped; await the
/// handle to make sure all output is written.
pub fn spawn_reporter(reporter: ProgressReporter) -> (ProgressSender, JoinHandle<MailboxStats>) {
    let (tx, handle) = spawn_actor("progress-reporter", MAILBOX, reporter);
    (ProgressSender::new(tx), handle)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        io::{self, Write},
        sync::{Arc, Mutex},
    };

    /// In-memory output shared between a reporter and the test.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::SharedBuffer, *};

    #[tokio::test]
    async fn in_place_lines_are_closed_before_full_lines() {
        let buffer = SharedBuffer::default();
        let (progress, handle) = spawn_reporter(ProgressReporter::new(buffer.clone()));

        progress.send(ProgressEvent::Tally { ok: 1, errors: 0 }).await;
        progress.send(ProgressEvent::Tally { ok: 2, errors: 1 }).await;
        progress.line("done").await;
        progress
            .send(ProgressEvent::Fill {
                collection: "db.c".into(),
                count: 3,
                expected: Some(6),
            })
            .await;
        progress
            .send(ProgressEvent::Fill {
                collection: "db.c".into(),
                count: 6,
                expected: Some(6),
            })
            .await;
        drop(progress);
        let stats = handle.await.unwrap();

        assert_eq!(stats, MailboxStats { handled: 5, failed: 0 });
        assert_eq!(
            buffer.contents(),
            "\rProgress OK: 1, errors: 0\rProgress OK: 2, errors: 1\ndone\n\rdb.c Count: 3/6\rdb.c Count: 6/6\n"
        );
    }

    #[tokio::test]
    async fn open_line_is_closed_on_stop() {
        let buffer = SharedBuffer::default();
        let (progress, handle) = spawn_reporter(ProgressReporter::new(buffer.clone()));

        progress.send(ProgressEvent::Tally { ok: 5, errors: 0 }).await;
        drop(progress);
        handle.await.unwrap();

        assert_eq!(buffer.contents(), "\rProgress OK: 5, errors: 0\n");
    }
}
