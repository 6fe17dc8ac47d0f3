//! Engine configuration.
//!
//! Every struct carries the documented defaults via `Default` and accepts partial
//! input through `#[serde(default)]`, so a TOML file only needs the values it changes.
//! `validate()` is the single place construction arguments are checked; engines call
//! it from their constructors and fail with `ConfigError` before any bar is seen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::indicator::IndicatorKind;
use crate::domain::{InstrumentError, Timeframe};
use crate::fingerprint::{self, ConfigHash};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("primary timeframe {primary} is not among the configured timeframes")]
    PrimaryNotConfigured { primary: Timeframe },

    #[error("invalid instrument: {0}")]
    Instrument(#[from] InstrumentError),

    #[error("config serialization failed: {0}")]
    Serialization(String),
}

fn check_periods(field: &'static str, periods: &[usize]) -> Result<(), ConfigError> {
    match periods.iter().find(|&&p| p == 0) {
        Some(&p) => Err(ConfigError::OutOfRange {
            field,
            value: p as f64,
            expected: ">= 1",
        }),
        None => Ok(()),
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "finite and >= 0",
        })
    }
}

/// Swing structure engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Lookback per timeframe index; timeframes past the end use the first entry.
    pub lookbacks: Vec<usize>,
    /// Minimum window range, in ticks, for a swing to count.
    pub min_swing_ticks: f64,
    /// Levels retained per (timeframe, kind).
    pub max_zones_per_tf: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            lookbacks: vec![20, 50, 100, 200],
            min_swing_ticks: 2.0,
            max_zones_per_tf: 3,
        }
    }
}

impl SwingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookbacks.is_empty() {
            return Err(ConfigError::Empty {
                field: "swing.lookbacks",
            });
        }
        check_periods("swing.lookbacks", &self.lookbacks)?;
        check_non_negative("swing.min_swing_ticks", self.min_swing_ticks)?;
        if self.max_zones_per_tf == 0 {
            return Err(ConfigError::OutOfRange {
                field: "swing.max_zones_per_tf",
                value: 0.0,
                expected: ">= 1",
            });
        }
        Ok(())
    }

    /// Longest configured lookback.
    pub fn max_lookback(&self) -> usize {
        self.lookbacks.iter().copied().max().unwrap_or(0)
    }
}

/// Volume profile engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub bins: usize,
    /// Trailing bars included in the profile.
    pub window: usize,
    /// Fraction of total smoothed volume the value area must reach.
    pub value_area_pct: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            bins: 20,
            window: 50,
            value_area_pct: 0.70,
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bins == 0 {
            return Err(ConfigError::OutOfRange {
                field: "profile.bins",
                value: 0.0,
                expected: ">= 1",
            });
        }
        if self.window == 0 {
            return Err(ConfigError::OutOfRange {
                field: "profile.window",
                value: 0.0,
                expected: ">= 1",
            });
        }
        if !(self.value_area_pct > 0.0 && self.value_area_pct <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "profile.value_area_pct",
                value: self.value_area_pct,
                expected: "(0, 1]",
            });
        }
        Ok(())
    }
}

/// Weight applied to each indicator class in the regime score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeWeights {
    pub ma: f64,
    pub adx: f64,
    pub rsi: f64,
}

impl Default for RegimeWeights {
    fn default() -> Self {
        Self {
            ma: 1.0,
            adx: 0.5,
            rsi: 0.5,
        }
    }
}

/// Regime detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub ma_periods: Vec<usize>,
    pub adx_periods: Vec<usize>,
    pub rsi_periods: Vec<usize>,
    pub weights: RegimeWeights,
    pub up_threshold: f64,
    pub down_threshold: f64,
    /// EMA factor applied to the raw score each evaluation.
    pub smoothing: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            ma_periods: vec![1, 5, 15, 60],
            adx_periods: vec![14],
            rsi_periods: vec![14],
            weights: RegimeWeights::default(),
            up_threshold: 0.2,
            down_threshold: -0.2,
            smoothing: 0.3,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_periods("regime.ma_periods", &self.ma_periods)?;
        check_periods("regime.adx_periods", &self.adx_periods)?;
        check_periods("regime.rsi_periods", &self.rsi_periods)?;
        check_non_negative("regime.weights.ma", self.weights.ma)?;
        check_non_negative("regime.weights.adx", self.weights.adx)?;
        check_non_negative("regime.weights.rsi", self.weights.rsi)?;
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "regime.smoothing",
                value: self.smoothing,
                expected: "(0, 1]",
            });
        }
        if !self.up_threshold.is_finite() || !self.down_threshold.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "regime.up_threshold",
                value: self.up_threshold,
                expected: "finite thresholds",
            });
        }
        if self.down_threshold >= self.up_threshold {
            return Err(ConfigError::OutOfRange {
                field: "regime.down_threshold",
                value: self.down_threshold,
                expected: "< up_threshold",
            });
        }
        Ok(())
    }
}

/// Signal fusion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Relative distance beyond the swing level required for a breakout (0.001 = 0.1%).
    pub breakout_threshold: f64,
    /// Relative distance to the value-area edge accepted as confluence (0.002 = 0.2%).
    pub confluence_tolerance: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            breakout_threshold: 0.001,
            confluence_tolerance: 0.002,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("fusion.breakout_threshold", self.breakout_threshold)?;
        check_non_negative("fusion.confluence_tolerance", self.confluence_tolerance)
    }
}

/// Complete engine configuration for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeframe whose bar close drives evaluation.
    pub primary: Timeframe,
    /// Timeframes scanned for swing structure, in lookback order.
    pub timeframes: Vec<Timeframe>,
    pub swing: SwingConfig,
    pub profile: ProfileConfig,
    pub regime: RegimeConfig,
    pub fusion: FusionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            primary: Timeframe::minutes(1),
            timeframes: [1, 5, 15, 60].map(Timeframe::minutes).to_vec(),
            swing: SwingConfig::default(),
            profile: ProfileConfig::default(),
            regime: RegimeConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframes.is_empty() {
            return Err(ConfigError::Empty {
                field: "timeframes",
            });
        }
        if !self.timeframes.contains(&self.primary) {
            return Err(ConfigError::PrimaryNotConfigured {
                primary: self.primary,
            });
        }
        self.swing.validate()?;
        self.profile.validate()?;
        self.regime.validate()?;
        self.fusion.validate()
    }

    /// Primary bars required before evaluation is meaningful: longest lookback plus a margin.
    pub fn bars_required(&self) -> usize {
        self.swing.max_lookback() + 5
    }

    /// Bars of history per timeframe that evaluation can read: the swing window
    /// before the signal bar, the profile window, and every regime indicator tail.
    pub fn retained_bars(&self) -> usize {
        let tail = |kind: IndicatorKind, periods: &[usize], count: usize| {
            periods.iter().map(|&p| kind.history(p) + count).max().unwrap_or(0)
        };
        [
            self.swing.max_lookback() + 1,
            self.profile.window,
            tail(IndicatorKind::MovingAverage, &self.regime.ma_periods, 2),
            tail(IndicatorKind::TrendStrength, &self.regime.adx_periods, 1),
            tail(IndicatorKind::Momentum, &self.regime.rsi_periods, 1),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Deterministic hash over every parameter.
    pub fn fingerprint(&self) -> Result<ConfigHash, ConfigError> {
        fingerprint::hash_json(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}
