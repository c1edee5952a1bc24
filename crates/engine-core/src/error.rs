use connectors::error::ClientError;
use thiserror::Error;

/// Errors raised by a single worker; any of them ends that worker.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Failed to write batch to '{collection}': {source}")]
    Write {
        collection: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to read '{collection}/{key}': {source}")]
    Read {
        collection: String,
        key: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to count documents of '{collection}': {source}")]
    Count {
        collection: String,
        #[source]
        source: ClientError,
    },

    #[error("Transaction on '{collection}' failed during {stage}: {source}")]
    Transaction {
        collection: String,
        stage: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Query failed: {0}")]
    Query(#[source] ClientError),

    #[error("Document source error: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors of a streaming document source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Expected count can not be 0")]
    CountZero,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid token '{token}' in input, expected a positive number")]
    InvalidToken { token: String },
}
