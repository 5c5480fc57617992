use anyhow::Result;
use sqlite_tutorial::{logging::init_logging, tutorial, Engine, TutorialConfig};

fn main() -> Result<()> {
    let mut config = TutorialConfig::default();
    config.engine.echo = true;
    config.logging.file = Some("tutorial.log".into());
    init_logging(&config.logging)?;

    let engine = Engine::new(config.engine)?;
    tutorial::run(&engine, &mut std::io::stdout().lock())?;
    Ok(())
}
