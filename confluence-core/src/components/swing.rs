//! Swing structure engine: trailing-window extremes per timeframe.
//!
//! Each requested timeframe contributes at most one swing high (window max) and
//! one swing low (window min). Candidates are then grouped by (timeframe, kind)
//! and each group is cut to the `max_zones_per_tf` most extreme levels. A timeframe
//! listed more than once with different lookbacks yields several candidates in
//! the same group.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{ConfigError, SwingConfig};
use crate::data::{BarFeed, FeedError};
use crate::domain::{Bar, SwingKind, SwingLevel, Timeframe};

#[derive(Debug, Clone)]
pub struct SwingEngine {
    config: SwingConfig,
}

impl SwingEngine {
    pub fn new(config: SwingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SwingConfig {
        &self.config
    }

    /// Lookback for the timeframe at `index`, falling back to the first lookback.
    pub fn lookback_for(&self, index: usize) -> usize {
        self.config
            .lookbacks
            .get(index)
            .copied()
            .unwrap_or(self.config.lookbacks[0])
    }

    /// Scan `timeframes` and return the retained swing levels.
    ///
    /// Timeframes without enough bars, or whose window range is under the
    /// minimum swing size, contribute nothing. An unconfigured timeframe is a
    /// lookup error.
    pub fn calculate_swings(
        &self,
        feed: &dyn BarFeed,
        timeframes: &[Timeframe],
    ) -> Result<Vec<SwingLevel>, FeedError> {
        self.scan(feed, timeframes, None)
    }

    /// Like [`calculate_swings`](Self::calculate_swings), but every window ends
    /// strictly before `cutoff`. Used to measure a closing bar against the
    /// structure it is breaking out of.
    pub fn calculate_swings_before(
        &self,
        feed: &dyn BarFeed,
        timeframes: &[Timeframe],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SwingLevel>, FeedError> {
        self.scan(feed, timeframes, Some(cutoff))
    }

    fn scan(
        &self,
        feed: &dyn BarFeed,
        timeframes: &[Timeframe],
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<SwingLevel>, FeedError> {
        let min_range = feed.instrument().ticks(self.config.min_swing_ticks);
        let mut candidates = Vec::with_capacity(timeframes.len() * 2);

        for (i, &tf) in timeframes.iter().enumerate() {
            let lookback = self.lookback_for(i);
            let series = feed.bars(tf)?;
            let window = match cutoff {
                Some(cutoff) => series.trailing_before(lookback, cutoff),
                None => series.trailing(lookback),
            };
            let Some(window) = window else {
                debug!(timeframe = %tf, lookback, bars = series.len(), "swing scan skipped: warming up");
                continue;
            };

            let (high, low) = window_extremes(window);
            if high - low < min_range {
                debug!(timeframe = %tf, high, low, min_range, "swing scan skipped: range too small");
                continue;
            }

            candidates.push(SwingLevel::new(high, tf, SwingKind::SwingHigh));
            candidates.push(SwingLevel::new(low, tf, SwingKind::SwingLow));
        }

        Ok(retain_extremes(candidates, self.config.max_zones_per_tf))
    }
}

/// Highest high and lowest low across `bars`.
pub fn window_extremes(bars: &[Bar]) -> (f64, f64) {
    bars.iter().fold((f64::MIN, f64::MAX), |(hi, lo), b| {
        (hi.max(b.high), lo.min(b.low))
    })
}

/// Group candidates by (timeframe, kind) and keep the `max_per_group` most extreme
/// of each: highest prices for swing highs, lowest for swing lows.
///
/// Groups appear in the order their first candidate was seen; within a group
/// levels are ordered most extreme first.
pub fn retain_extremes(candidates: Vec<SwingLevel>, max_per_group: usize) -> Vec<SwingLevel> {
    let mut groups: Vec<((Timeframe, SwingKind), Vec<SwingLevel>)> = Vec::new();
    for level in candidates {
        let key = (level.timeframe, level.kind);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(level),
            None => groups.push((key, vec![level])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(_, mut members)| {
            members.sort_by(|a, b| b.extremeness().total_cmp(&a.extremeness()));
            members.truncate(max_per_group);
            members
        })
        .collect()
}
