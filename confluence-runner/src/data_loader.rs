//! CSV bar loading.
//!
//! Expected header: `timestamp,open,high,low,close,volume`, with RFC 3339 UTC
//! timestamps marking each bar's close. Rows that fail the OHLC sanity check or
//! do not advance the timestamp are skipped with a warning rather than aborting
//! the load; a malformed row (unparseable field) is an error.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use confluence_core::domain::{Bar, Timeframe};

use crate::config::BarFileSpec;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl From<CsvRow> for Bar {
    fn from(row: CsvRow) -> Self {
        Bar {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

/// Bars accepted from one source plus the count of rows dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub skipped: usize,
}

/// Parse bars from any CSV reader.
pub fn read_bars<R: io::Read>(reader: R) -> Result<LoadedBars, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut loaded = LoadedBars::default();

    for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let bar: Bar = row?.into();
        if !bar.is_sane() {
            warn!(row = line + 1, timestamp = %bar.timestamp, "skipping bar that fails OHLC sanity check");
            loaded.skipped += 1;
            continue;
        }
        if let Some(last) = loaded.bars.last() {
            if bar.timestamp <= last.timestamp {
                warn!(row = line + 1, timestamp = %bar.timestamp, last = %last.timestamp, "skipping out-of-order bar");
                loaded.skipped += 1;
                continue;
            }
        }
        loaded.bars.push(bar);
    }

    Ok(loaded)
}

/// Load bars from a CSV file.
pub fn load_bars(path: &Path) -> Result<LoadedBars, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_bars(io::BufReader::new(file)).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        bars = loaded.bars.len(),
        skipped = loaded.skipped,
        "bars loaded"
    );
    Ok(loaded)
}

/// Load every file in `specs`, tagged with its timeframe.
pub fn load_streams(specs: &[BarFileSpec]) -> Result<Vec<(Timeframe, Vec<Bar>)>, LoadError> {
    specs
        .iter()
        .map(|spec| Ok((spec.timeframe, load_bars(&spec.path)?.bars)))
        .collect()
}
