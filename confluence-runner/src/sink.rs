//! Analytics sinks: fire-and-forget destinations for emitted trade records.
//!
//! `JsonlSink` appends one JSON object per line, so the file survives partial
//! writes and streams easily. `MemorySink` keeps records in a Vec for tests and
//! in-process consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use confluence_core::components::Verdict;
use confluence_core::domain::{Direction, RegimeLabel};
use confluence_core::fingerprint::ConfigHash;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink lock poisoned")]
    Poisoned,
}

/// One emitted signal, as handed to the analytics layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub regime: RegimeLabel,
    pub regime_strength: f64,
    pub swing_count: usize,
    pub zone_count: usize,
    pub verdict: Verdict,
    pub config_hash: ConfigHash,
}

/// Destination for trade records.
pub trait AnalyticsSink: Send {
    fn record(&mut self, record: &TradeRecord) -> Result<(), SinkError>;
}

/// Append-only JSONL trade log.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records back. Malformed lines are skipped.
    pub fn read_all(&self) -> io::Result<Vec<TradeRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<TradeRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl AnalyticsSink for JsonlSink {
    fn record(&mut self, record: &TradeRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TradeRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<TradeRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AnalyticsSink for MemorySink {
    fn record(&mut self, record: &TradeRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
