use connectors::error::ClientError;
use engine_core::error::WorkloadError;
use thiserror::Error;

/// Outcome of a parallel run in which at least one worker failed.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{failed} of {total} workers failed")]
    WorkersFailed { failed: usize, total: usize },
}

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("Can not list databases of the {side} cluster: {source}")]
    Databases {
        side: model::checksum::Side,
        #[source]
        source: ClientError,
    },

    #[error("Can not get cluster health of the {side} cluster: {source}")]
    Health {
        side: model::checksum::Side,
        #[source]
        source: ClientError,
    },

    #[error("Can not get inventory of '{database}' on the {side} cluster: {source}")]
    Inventory {
        side: model::checksum::Side,
        database: String,
        #[source]
        source: ClientError,
    },

    #[error("Checksum run was cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Errors of the one-shot create/delete commands.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Can not {action} '{name}': {source}")]
    Client {
        action: &'static str,
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("Workload error: {0}")]
    Workload(#[from] WorkloadError),

    #[error("{0}")]
    Driver(#[from] DriverError),
}

impl SetupError {
    pub fn client(action: &'static str, name: impl Into<String>) -> impl FnOnce(ClientError) -> Self {
        let name = name.into();
        move |source| SetupError::Client {
            action,
            name,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}
