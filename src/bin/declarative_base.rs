use anyhow::Result;
use sqlite_tutorial::{logging::init_logging, models, Engine, LoggingConfig, SqliteConfig};

fn main() -> Result<()> {
    init_logging(&LoggingConfig::default())?;

    let engine = Engine::new(SqliteConfig::in_memory().with_echo(true))?;
    models::metadata().create_all(&engine)?;
    Ok(())
}
