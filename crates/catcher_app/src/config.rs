//! Runtime configuration, read from an optional RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use catcher_core::SessionKeyMode;
use catcher_engine::{EngineConfig, SinkSettings};
use engine_logging::LogDestination;
use log::LevelFilter;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "stream_catcher.ron";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatcherConfig {
    pub sink_endpoint: String,
    pub sink_timeout_ms: u64,
    pub notify_queue_depth: usize,
    pub event_queue_depth: usize,
    pub state_path: PathBuf,
    pub session_keys: SessionKeyMode,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub log_path: PathBuf,
}

impl Default for CatcherConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            sink_endpoint: engine.sink.endpoint,
            sink_timeout_ms: engine.sink.timeout.as_millis() as u64,
            notify_queue_depth: engine.notify_queue_depth,
            event_queue_depth: engine.event_queue_depth,
            state_path: PathBuf::from(".stream_catcher_state.json"),
            session_keys: engine.session_keys,
            log_destination: LogDestination::Terminal,
            log_level: "info".to_string(),
            log_path: PathBuf::from("./engine.log"),
        }
    }
}

impl CatcherConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sink: SinkSettings {
                endpoint: self.sink_endpoint.clone(),
                timeout: Duration::from_millis(self.sink_timeout_ms),
            },
            notify_queue_depth: self.notify_queue_depth,
            event_queue_depth: self.event_queue_depth,
            session_keys: self.session_keys,
        }
    }

    /// Unknown level names fall back to `Info`.
    pub fn level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

/// Loads the config from `path`, or from [`DEFAULT_CONFIG_FILENAME`] in the
/// working directory when no path is given. Only an explicit path has to exist.
pub fn load_config(path: Option<&Path>) -> Result<CatcherConfig> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
    };
    if !required && !path.exists() {
        return Ok(CatcherConfig::default());
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("reading config {:?}", path))?;
    parse_config(&content).with_context(|| format!("parsing config {:?}", path))
}

pub fn parse_config(content: &str) -> Result<CatcherConfig> {
    Ok(ron::from_str(content)?)
}
