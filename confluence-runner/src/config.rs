//! Serializable runner configuration, loadable from TOML.
//!
//! ```toml
//! output_dir = "signals"
//!
//! [[session]]
//! instrument = { symbol = "ES", tick_size = 0.25, asset_class = "Future" }
//!
//! [session.engine]
//! primary = 1
//! timeframes = [1, 5, 15, 60]
//!
//! [[session.data]]
//! timeframe = 1
//! path = "data/es_1m.csv"
//!
//! [[session.news]]
//! start = "2024-06-07T12:30:00Z"
//! end = "2024-06-07T12:31:00Z"
//! impact = "High"
//! description = "Nonfarm payrolls"
//! ```
//!
//! Omitted engine sections fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use confluence_core::components::NewsEvent;
use confluence_core::config::{ConfigError, EngineConfig};
use confluence_core::domain::{Instrument, Timeframe};
use confluence_core::fingerprint::{self, ConfigHash};

#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("session {symbol}: {source}")]
    Session { symbol: String, source: ConfigError },

    #[error("no sessions configured")]
    NoSessions,
}

/// One CSV file of completed bars for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarFileSpec {
    pub timeframe: Timeframe,
    pub path: PathBuf,
}

/// Everything one instrument's session needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub instrument: Instrument,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub news: Vec<NewsEvent>,
    #[serde(default)]
    pub data: Vec<BarFileSpec>,
}

impl SessionConfig {
    pub fn new(instrument: Instrument, engine: EngineConfig) -> Self {
        Self {
            instrument,
            engine,
            news: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Re-checks the instrument (deserialization bypasses `Instrument::new`) and the engine config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Instrument::new(
            self.instrument.symbol.clone(),
            self.instrument.tick_size,
            self.instrument.asset_class,
        )?;
        self.engine.validate()
    }

    /// Fingerprint over the instrument and engine parameters. News and data paths are excluded.
    pub fn fingerprint(&self) -> Result<ConfigHash, ConfigError> {
        fingerprint::hash_json(&(&self.instrument, &self.engine))
            .map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

/// Top-level runner configuration: one session per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory receiving one `<symbol>.jsonl` trade log per session.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(rename = "session", default)]
    pub sessions: Vec<SessionConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("signals")
}

impl RunnerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, RunnerConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RunnerConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), RunnerConfigError> {
        if self.sessions.is_empty() {
            return Err(RunnerConfigError::NoSessions);
        }
        for session in &self.sessions {
            session
                .validate()
                .map_err(|source| RunnerConfigError::Session {
                    symbol: session.instrument.symbol.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
