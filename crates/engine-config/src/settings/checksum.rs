use super::{
    connection::ConnectionSettings,
    error::SettingsError,
    validator::{SettingsValidator, Validate},
};
use std::time::Duration;

pub const DEFAULT_THROTTLE: usize = 30;
pub const DEFAULT_SHARD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `test checksum`: compare shard checksums of two clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumSettings {
    pub source: ConnectionSettings,
    pub target: ConnectionSettings,
    /// Restrict the comparison to one database.
    pub database: Option<String>,
    pub verbose: bool,
    /// Collection checksum tasks in flight, shared by both clusters.
    pub throttle: usize,
    pub shard_timeout: Duration,
}

impl ChecksumSettings {
    pub fn new(source: ConnectionSettings, target: ConnectionSettings) -> Self {
        Self {
            source,
            target,
            database: None,
            verbose: false,
            throttle: DEFAULT_THROTTLE,
            shard_timeout: DEFAULT_SHARD_TIMEOUT,
        }
    }
}

impl Validate for ChecksumSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        // DB servers only answer shard level requests for superuser tokens.
        if !self.source.credentials.is_jwt() {
            return Err(SettingsError::Missing("--jwt".into()));
        }
        SettingsValidator::new()
            .check(!self.source.endpoints.is_empty(), "source endpoint is required")
            .check(
                !self.target.endpoints.is_empty(),
                "--endpoint-target is required",
            )
            .positive("throttle", self.throttle as u64)
            .check(
                self.database.as_deref().is_none_or(|d| !d.is_empty()),
                "database must not be empty",
            )
            .finish()
    }
}
