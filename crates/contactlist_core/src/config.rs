//! Application configuration.
//!
//! Built in code by the embedding binary or test harness; the core reads no
//! environment variables or config files.

use crate::logging::LoggingConfig;
use std::path::PathBuf;

/// Settings for one `AppContext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database file. Every execution scope opens its own connection
    /// to this file.
    pub db_path: PathBuf,
    /// File logging, initialized once during bootstrap when present.
    pub logging: Option<LoggingConfig>,
}

impl AppConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            logging: None,
        }
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }
}
