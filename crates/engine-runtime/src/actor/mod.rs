//! Tasks that own their state and are only reached through a bounded mailbox.

pub mod reporter;

use crate::error::ActorError;
use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

#[async_trait]
pub trait Actor<M: Send + 'static>: Send + 'static {
    async fn handle(&mut self, msg: M) -> Result<(), ActorError>;

    /// Called once the last sender is gone and the mailbox is empty.
    async fn on_stop(&mut self) -> Result<(), ActorError> {
        Ok(())
    }
}

/// What happened to the messages of a mailbox that has been drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    pub handled: u64,
    pub failed: u64,
}

/// Moves `actor` onto its own task. A failed message is logged and counted,
/// the actor keeps running.
pub fn spawn_actor<M, A>(name: &'static str, capacity: usize, mut actor: A) -> (mpsc::Sender<M>, JoinHandle<MailboxStats>)
where
    M: Send + 'static,
    A: Actor<M>,
{
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut stats = MailboxStats::default();
        while let Some(msg) = rx.recv().await {
            stats.handled += 1;
            if let Err(e) = actor.handle(msg).await {
                stats.failed += 1;
                warn!(actor = name, error = %e, "Message could not be handled");
            }
        }
        if let Err(e) = actor.on_stop().await {
            warn!(actor = name, error = %e, "Actor failed to stop cleanly");
        }
        debug!(actor = name, handled = stats.handled, failed = stats.failed, "Mailbox drained");
        stats
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_test::traced_test;

    /// Sums numbers and rejects odd ones.
    struct EvenSum(u64);

    #[async_trait]
    impl Actor<u64> for EvenSum {
        async fn handle(&mut self, msg: u64) -> Result<(), ActorError> {
            if msg % 2 == 1 {
                return Err(io::Error::other("odd").into());
            }
            self.0 += msg;
            Ok(())
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn failures_are_counted_and_do_not_stop_the_actor() {
        let (tx, handle) = spawn_actor("even-sum", 4, EvenSum(0));
        for n in [2, 3, 4, 5, 6] {
            tx.send(n).await.unwrap();
        }
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats, MailboxStats { handled: 5, failed: 2 });
        assert!(logs_contain("Message could not be handled"));
    }

    #[tokio::test]
    async fn zero_capacity_still_gets_a_mailbox() {
        let (tx, handle) = spawn_actor("even-sum", 0, EvenSum(0));
        tx.send(8).await.unwrap();
        drop(tx);
        assert_eq!(handle.await.unwrap().handled, 1);
    }
}
