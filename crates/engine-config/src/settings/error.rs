use thiserror::Error;

/// Errors raised while turning command line input into settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// One or more values were out of range.
    #[error("Settings validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// Two options cannot be used together.
    #[error("Conflicting settings: {0}")]
    Conflict(String),

    /// A required value was not given, neither as a flag nor via environment.
    #[error("Missing required setting: {0}")]
    Missing(String),
}
