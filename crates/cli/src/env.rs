use crate::error::CliError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const JWT: &str = "COLLECTIONMAKER_JWT";
pub const USERNAME: &str = "COLLECTIONMAKER_USERNAME";
pub const PASSWORD: &str = "COLLECTIONMAKER_PASSWORD";
pub const JWT_TARGET: &str = "COLLECTIONMAKER_JWT_TARGET";

/// Variables from the process environment, overlaid by an env file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// `~/.collectionmaker/env`
    pub fn default_file() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".collectionmaker").join("env"))
    }

    /// Loads `path` when given, otherwise the default file if it exists.
    pub fn load(&mut self, path: Option<&Path>) -> Result<(), CliError> {
        match path {
            Some(path) => self.load_from_file(path),
            None => match Self::default_file().filter(|p| p.is_file()) {
                Some(path) => self.load_from_file(path),
                None => Ok(()),
            },
        }
    }

    /// Load variables from an env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        debug!(path = %path.display(), "Loaded env file");
        Ok(())
    }

    /// Non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// The flag value when given, the variable otherwise.
    pub fn or_flag(&self, flag: Option<String>, key: &str) -> Option<String> {
        flag.filter(|v| !v.is_empty()).or_else(|| self.get(key))
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim().trim_start_matches("export ").trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}
