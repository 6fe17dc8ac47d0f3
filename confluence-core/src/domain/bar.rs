//! Bar: the fundamental market data unit, and the per-timeframe series that holds it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Timeframe;

/// OHLCV bar for a single instrument on a single timeframe.
///
/// `timestamp` is the bar's close time in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar at {timestamp} on {timeframe} failed OHLC sanity check")]
    NotSane {
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    },

    #[error("bar at {next} on {timeframe} does not follow the last bar at {last}")]
    OutOfOrder {
        timeframe: Timeframe,
        last: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

/// Ordered bar history for one timeframe.
///
/// Stored oldest-first so indicators can run over `as_slice()` in time order.
/// Bars-ago access (`ago(0)` is the newest bar) matches the feed convention
/// where index 0 is the most recent bar.
///
/// With a retention cap the series keeps between `cap` and `2 * cap - 1` bars,
/// dropping the oldest in batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    timeframe: Timeframe,
    bars: Vec<Bar>,
    #[serde(default)]
    retention: Option<usize>,
}

impl BarSeries {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            bars: Vec::new(),
            retention: None,
        }
    }

    /// Build a series from chronologically ordered bars, validating each one.
    pub fn from_bars(timeframe: Timeframe, bars: Vec<Bar>) -> Result<Self, BarError> {
        let mut series = Self::with_capacity(timeframe, bars.len());
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    pub fn with_capacity(timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            timeframe,
            bars: Vec::with_capacity(capacity),
            retention: None,
        }
    }

    /// Cap retained history at `cap` bars (at least 1); `None` keeps everything.
    pub fn set_retention(&mut self, cap: Option<usize>) {
        self.retention = cap.map(|c| c.max(1));
        self.trim();
    }

    pub fn retention(&self) -> Option<usize> {
        self.retention
    }

    fn trim(&mut self) {
        if let Some(cap) = self.retention {
            if self.bars.len() >= 2 * cap {
                let excess = self.bars.len() - cap;
                self.bars.drain(..excess);
            }
        }
    }

    /// Append a completed bar. Timestamps must be strictly increasing.
    pub fn push(&mut self, bar: Bar) -> Result<(), BarError> {
        if !bar.is_sane() {
            return Err(BarError::NotSane {
                timeframe: self.timeframe,
                timestamp: bar.timestamp,
            });
        }
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(BarError::OutOfOrder {
                    timeframe: self.timeframe,
                    last: last.timestamp,
                    next: bar.timestamp,
                });
            }
        }
        self.bars.push(bar);
        self.trim();
        Ok(())
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar `n` bars ago; `ago(0)` is the most recent bar.
    pub fn ago(&self, n: usize) -> Option<&Bar> {
        self.bars.len().checked_sub(n + 1).map(|i| &self.bars[i])
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The trailing `n` bars in chronological order, or `None` if fewer exist.
    pub fn trailing(&self, n: usize) -> Option<&[Bar]> {
        let start = self.bars.len().checked_sub(n)?;
        Some(&self.bars[start..])
    }

    /// The `n` bars immediately before `cutoff` (exclusive), or `None` if fewer exist.
    pub fn trailing_before(&self, n: usize, cutoff: DateTime<Utc>) -> Option<&[Bar]> {
        let end = self.bars.partition_point(|b| b.timestamp < cutoff);
        let start = end.checked_sub(n)?;
        Some(&self.bars[start..end])
    }

    /// All bars in chronological order (oldest first).
    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }
}
