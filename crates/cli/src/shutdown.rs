use crate::error::CliError;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Turns SIGINT or SIGTERM into a cancelled token.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Spawns the signal listener. A handler that cannot be installed is
    /// logged and never fires.
    pub fn listen(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let interrupt = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!(error = %e, "SIGINT handler unavailable");
                    std::future::pending::<()>().await;
                }
            };
            tokio::select! {
                _ = interrupt => this.trigger("SIGINT"),
                _ = terminate() => this.trigger("SIGTERM"),
            }
        });
    }

    pub fn trigger(&self, signal: &str) {
        info!(signal, "Stopping");
        self.requested.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs `work` until it finishes or a signal arrives, whichever is first.
    /// Work that drains on its own should watch [`Shutdown::token`] instead.
    pub async fn guard<T, F>(&self, work: F) -> Result<T, CliError>
    where
        F: Future<Output = Result<T, CliError>>,
    {
        tokio::select! {
            result = work => result,
            _ = self.token.cancelled() => Err(CliError::ShutdownRequested),
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Process exit status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Interrupted = 130,
}

impl ExitCode {
    pub fn of(result: &Result<(), CliError>) -> Self {
        match result {
            Ok(()) => ExitCode::Success,
            Err(CliError::ShutdownRequested) => ExitCode::Interrupted,
            Err(_) => ExitCode::GeneralError,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
