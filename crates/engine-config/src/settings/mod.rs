use error::SettingsError;
use std::fmt::Debug;
use tracing::{debug, info};
use validator::Validate;

pub mod checksum;
pub mod collection;
pub mod connection;
pub mod error;
pub mod graph;
pub mod validator;
pub mod workload;

/// Validates settings and hands them back for use.
pub fn validated<T: Validate + Debug>(settings: T) -> Result<T, SettingsError> {
    debug!("Validating settings: {settings:#?}");
    settings.validate()?;
    info!("Settings validation completed successfully");
    Ok(settings)
}
