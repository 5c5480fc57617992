use std::{io, path::PathBuf};

use rusqlite::types::FromSqlError;
use thiserror::Error;

/// Errors raised by the engine, the schema layer and the models.
///
/// Driver failures are passed through untouched in [`Error::Sqlite`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no value supplied for parameter `{0}`")]
    MissingParameter(String),

    #[error("positional parameter at index {0} is not supported, use a named parameter")]
    PositionalParameter(usize),

    #[error("result row has no column `{0}`")]
    NoSuchColumn(String),

    #[error("result row has no column at index {0}")]
    NoSuchIndex(usize),

    #[error("cannot convert column `{column}`: {source}")]
    Conversion {
        column: String,
        source: FromSqlError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("cannot open log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: io::Error },

    #[error("cannot install log subscriber: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
