//! Configuration for the engine and for log output.
//!
//! Every struct has usable defaults; the binaries never read a file or the
//! environment, they build their config in code. [`TutorialConfig::from_toml_str`]
//! exists for embedding the library elsewhere.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;

/// Path SQLite recognises as a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// Log every statement at info level
    pub echo: bool,
    /// Turn on `PRAGMA foreign_keys` when the connection is opened
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_path: IN_MEMORY.to_string(),
            echo: false,
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Create a config for a database file at `db_path`
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Create a config for a fresh in-memory database
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }
}

/// Where log lines go and how verbose they are.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `sqlite_tutorial=debug`
    pub level: String,
    /// Log file, truncated when logging starts
    pub file: Option<PathBuf>,
    /// Also write to stderr
    pub stream: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            stream: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TutorialConfig {
    pub engine: SqliteConfig,
    pub logging: LoggingConfig,
}

impl TutorialConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}
