use crate::settings::error::SettingsError;
use tracing::warn;

/// Implemented by every settings struct before it is handed to a workload.
pub trait Validate {
    fn validate(&self) -> Result<(), SettingsError>;
}

/// Collects all problems of a settings struct so they are reported together.
#[derive(Debug, Default)]
pub struct SettingsValidator {
    errors: Vec<String>,
}

impl SettingsValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positive(&mut self, name: &str, value: u64) -> &mut Self {
        if value == 0 {
            self.errors.push(format!("{name} must be greater than 0"));
        }
        self
    }

    pub fn non_empty(&mut self, name: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{name} must not be empty"));
        }
        self
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    /// Logs a warning for values that are legal but likely a mistake.
    pub fn warn_if(&mut self, suspicious: bool, message: &str) -> &mut Self {
        if suspicious {
            warn!("{message}");
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), SettingsError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::ValidationFailed(std::mem::take(
                &mut self.errors,
            )))
        }
    }
}
