use std::{fs::OpenOptions, sync::Mutex};

use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    config::LoggingConfig,
    error::{Error, Result},
};

/// Install the global subscriber described by `config`.
///
/// The filter comes from `config.level` only, `RUST_LOG` is not consulted.
/// The log file is appended to, earlier runs are kept.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.level).map_err(|err| Error::Logging(err.to_string()))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| Error::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stream_layer = config
        .stream
        .then(|| fmt::layer().with_target(true).with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stream_layer)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))?;

    debug!("set up logging");
    Ok(())
}
