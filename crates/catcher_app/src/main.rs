mod config;
mod driver;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use catcher_engine::{EngineHandle, FileStore};
use engine_logging::{engine_info, engine_warn};

fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    engine_logging::initialize(config.log_destination, config.level(), &config.log_path);
    engine_info!(
        "stream_catcher starting: sink={} state={:?}",
        config.sink_endpoint,
        config.state_path
    );

    let store = FileStore::open(&config.state_path)
        .with_context(|| format!("opening state store {:?}", config.state_path))?;
    let engine = EngineHandle::start(config.engine_config(), Arc::new(store))?;

    if let Err(err) = engine.health() {
        engine_warn!("Download service not reachable yet: {}", err);
    }

    driver::run(&engine, io::stdin().lock(), io::stdout().lock())?;
    engine_info!("Input closed, shutting down");
    Ok(())
}
