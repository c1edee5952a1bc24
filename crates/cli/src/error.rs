use connectors::error::ClientError;
use engine_config::settings::error::SettingsError;
use engine_runtime::error::{ChecksumError, DriverError, SetupError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Can not connect: {0}")]
    Connect(#[from] ClientError),

    #[error("{0}")]
    Setup(#[from] SetupError),

    #[error("{0}")]
    Driver(#[from] DriverError),

    #[error("Checksum comparison failed: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Progress reporter stopped unexpectedly: {0}")]
    Reporter(#[from] tokio::task::JoinError),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
