//! Indicator trait and the indicator kinds the regime detector consumes.
//!
//! Indicators are pure functions: bar history in, numeric series out. The bar
//! feed owns their evaluation so a platform-backed feed can substitute its own.

use crate::domain::Bar;
use crate::indicators::{Adx, Rsi, Sma};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for indicators.
///
/// Indicators take a full bar series (oldest first) and produce a numeric output
/// series of the same length. The first `lookback()` values should be `f64::NAN`.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "adx_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Periods of history a Wilder-smoothed indicator is given beyond its period.
/// The seed's weight in the newest value falls below 0.1% over that span.
pub const WILDER_SETTLE_PERIODS: usize = 10;

/// Indicator families scored by the regime detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Simple moving average of close.
    MovingAverage,
    /// ADX, unsigned in [0, 100].
    TrendStrength,
    /// RSI, in [0, 100] centred on 50.
    Momentum,
}

impl IndicatorKind {
    /// Build the reference implementation for this kind.
    pub fn build(self, period: usize) -> Box<dyn Indicator> {
        match self {
            IndicatorKind::MovingAverage => Box::new(Sma::new(period)),
            IndicatorKind::TrendStrength => Box::new(Adx::new(period)),
            IndicatorKind::Momentum => Box::new(Rsi::new(period)),
        }
    }

    /// Trailing bars needed to produce the newest value.
    ///
    /// Exact for the moving average. The Wilder-smoothed kinds depend on all prior
    /// history; beyond `WILDER_SETTLE_PERIODS` periods the remainder is negligible.
    pub fn history(self, period: usize) -> usize {
        match self {
            IndicatorKind::MovingAverage => period,
            IndicatorKind::TrendStrength | IndicatorKind::Momentum => {
                period.saturating_mul(WILDER_SETTLE_PERIODS)
            }
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::MovingAverage => write!(f, "MA"),
            IndicatorKind::TrendStrength => write!(f, "ADX"),
            IndicatorKind::Momentum => write!(f, "RSI"),
        }
    }
}
