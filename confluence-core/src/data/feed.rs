//! Bar feed trait, lookup errors, and an in-memory multi-timeframe feed.
//!
//! The engines never talk to a market-data platform directly. They ask a
//! `BarFeed` for a timeframe's bar series and for indicator series computed
//! over it; a platform adapter implements the trait, tests and replays use
//! `MemoryFeed`.

use std::collections::HashMap;
use thiserror::Error;

use crate::components::indicator::IndicatorKind;
use crate::config::ConfigError;
use crate::domain::{Bar, BarError, BarSeries, Instrument, Timeframe};

/// Structured error types for feed access.
#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    /// The caller asked for a timeframe the feed was never configured with.
    #[error("timeframe {0} not configured")]
    UnknownTimeframe(Timeframe),

    #[error("rejected bar: {0}")]
    Bar(#[from] BarError),
}

/// Source of bar history and indicator series for one instrument.
pub trait BarFeed {
    fn instrument(&self) -> &Instrument;

    /// Bar history for `timeframe`, or `UnknownTimeframe` if it was never configured.
    fn bars(&self, timeframe: Timeframe) -> Result<&BarSeries, FeedError>;

    /// Indicator values over the `timeframe` series, aligned with `bars(timeframe)` (oldest first).
    ///
    /// The default evaluates the reference indicator implementations; platform
    /// feeds may override this with their own computation.
    fn indicator_series(
        &self,
        timeframe: Timeframe,
        kind: IndicatorKind,
        period: usize,
    ) -> Result<Vec<f64>, FeedError> {
        let series = self.bars(timeframe)?;
        Ok(kind.build(period).compute(series.as_slice()))
    }

    /// The newest `count` indicator values on `timeframe`, oldest first.
    ///
    /// Computed over the trailing `kind.history(period) + count` bars only, so the
    /// cost does not grow with the length of the series. Fewer than `count`
    /// values come back when the series is shorter than `count`.
    fn indicator_tail(
        &self,
        timeframe: Timeframe,
        kind: IndicatorKind,
        period: usize,
        count: usize,
    ) -> Result<Vec<f64>, FeedError> {
        let bars = self.bars(timeframe)?.as_slice();
        let span = kind.history(period).saturating_add(count).min(bars.len());
        let values = kind.build(period).compute(&bars[bars.len() - span..]);
        Ok(values[values.len().saturating_sub(count)..].to_vec())
    }

    /// Close of the newest bar on `timeframe`.
    fn close(&self, timeframe: Timeframe) -> Result<Option<f64>, FeedError> {
        Ok(self.bars(timeframe)?.latest().map(|b| b.close))
    }
}

/// In-memory feed holding one series per configured timeframe.
///
/// Unbounded by default; `with_retention` caps how much history each series keeps.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    instrument: Instrument,
    timeframes: Vec<Timeframe>,
    series: HashMap<Timeframe, BarSeries>,
}

impl MemoryFeed {
    /// Register the fixed set of timeframes this feed serves. Duplicates collapse.
    pub fn new(instrument: Instrument, timeframes: &[Timeframe]) -> Result<Self, ConfigError> {
        if timeframes.is_empty() {
            return Err(ConfigError::Empty {
                field: "timeframes",
            });
        }
        let mut ordered = Vec::with_capacity(timeframes.len());
        let mut series = HashMap::with_capacity(timeframes.len());
        for &tf in timeframes {
            if series.insert(tf, BarSeries::new(tf)).is_none() {
                ordered.push(tf);
            }
        }
        Ok(Self {
            instrument,
            timeframes: ordered,
            series,
        })
    }

    /// Keep at least `bars` of history per timeframe and drop older bars.
    pub fn with_retention(mut self, bars: usize) -> Self {
        for series in self.series.values_mut() {
            series.set_retention(Some(bars));
        }
        self
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// Append a completed bar to `timeframe`.
    pub fn push(&mut self, timeframe: Timeframe, bar: Bar) -> Result<(), FeedError> {
        let series = self
            .series
            .get_mut(&timeframe)
            .ok_or(FeedError::UnknownTimeframe(timeframe))?;
        series.push(bar)?;
        Ok(())
    }

    /// Append many bars to `timeframe`, stopping at the first rejected bar.
    pub fn extend(
        &mut self,
        timeframe: Timeframe,
        bars: impl IntoIterator<Item = Bar>,
    ) -> Result<(), FeedError> {
        for bar in bars {
            self.push(timeframe, bar)?;
        }
        Ok(())
    }
}

impl BarFeed for MemoryFeed {
    fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    fn bars(&self, timeframe: Timeframe) -> Result<&BarSeries, FeedError> {
        self.series
            .get(&timeframe)
            .ok_or(FeedError::UnknownTimeframe(timeframe))
    }
}
