//! Runtime configuration for embedding the student core.
//!
//! # Responsibility
//! - Collect database location and logging settings in one value.
//! - Fill unset values from `STUDENT_*` environment variables.
//!
//! # Invariants
//! - A validated config never carries a relative `log_dir`.
//! - `log_level` is always one of `trace|debug|info|warn|error` after
//!   validation.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "STUDENT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "STUDENT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STUDENT_LOG_DIR";

/// Configuration error raised by [`CoreConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
    EmptyDbPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Core runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file path. `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a config from defaults overlaid with `STUDENT_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlays values returned by `lookup` onto unset or default fields.
    ///
    /// Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = read(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    /// Normalizes the log level in place and checks path constraints.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let level = normalize_level(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        self.log_level = level.to_string();

        if let Some(path) = &self.db_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDbPath);
            }
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}
