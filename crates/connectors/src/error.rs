use thiserror::Error;

/// All errors coming from the remote database client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport level failure (connect, TLS, body streaming).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but the body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success answer from the server.
    #[error("Server error (status {status}, errorNum {error_num}): {message}")]
    Server {
        status: u16,
        error_num: i64,
        message: String,
    },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_))
    }

    /// Maps a status code and the server's error body to an error variant.
    pub fn from_status(status: u16, error_num: i64, message: String) -> Self {
        match status {
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            _ => ClientError::Server {
                status,
                error_num,
                message,
            },
        }
    }
}
