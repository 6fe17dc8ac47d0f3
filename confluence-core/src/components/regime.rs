//! Regime detector: weighted indicator vote with persistent EMA smoothing.
//!
//! Each configured indicator casts a weighted vote in [-1, 1] per unit weight:
//! - moving average: sign of the SMA's one-bar change, period P read from the
//!   P-minute series when the feed has one
//! - ADX: value / 100 (unsigned, so it only ever pushes the score up)
//! - RSI: (value - 50) / 50
//!
//! Votes are normalized by total weight into a raw score, then folded into the
//! smoothed score with `smoothed = α·raw + (1 − α)·smoothed`. The smoothed score
//! lives on the detector and is never reset; one detector per instrument.

use tracing::debug;

use crate::components::indicator::IndicatorKind;
use crate::config::{ConfigError, RegimeConfig};
use crate::data::{BarFeed, FeedError};
use crate::domain::{RegimeLabel, RegimeSignal, Timeframe};

/// Weighted vote total before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegimeScore {
    pub score: f64,
    pub weight: f64,
}

impl RegimeScore {
    fn add(&mut self, vote: f64, weight: f64) {
        self.score += vote * weight;
        self.weight += weight;
    }

    /// Normalized score; 0 when nothing voted.
    pub fn raw(&self) -> f64 {
        if self.weight > 0.0 {
            self.score / self.weight
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeDetector {
    config: RegimeConfig,
    smoothed: f64,
}

impl RegimeDetector {
    pub fn new(config: RegimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            smoothed: 0.0,
        })
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Current smoothed score (unrounded).
    ///
    /// Stays within [-1, 1]. A constant raw score of +1 approaches 1 without
    /// reaching it in exact arithmetic, but in `f64` the gap rounds away and the
    /// score settles at exactly 1.0 after roughly a hundred evaluations.
    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    /// Score the indicators on `timeframe`, advance the smoothed state, and classify.
    pub fn current_regime(
        &mut self,
        feed: &dyn BarFeed,
        timeframe: Timeframe,
    ) -> Result<RegimeSignal, FeedError> {
        let votes = self.score(feed, timeframe)?;
        let signal = self.update(votes.raw());
        debug!(
            timeframe = %timeframe,
            raw = votes.raw(),
            weight = votes.weight,
            smoothed = self.smoothed,
            label = %signal.label,
            "regime evaluated"
        );
        Ok(signal)
    }

    /// Weighted indicator votes, with `timeframe` as the primary series.
    /// Does not touch the smoothed state.
    ///
    /// MA period P is scored on the P-minute series when the feed carries one
    /// (see [`ma_timeframe`]), otherwise on `timeframe`. ADX and RSI always read
    /// `timeframe`. Indicators still warming up (NaN latest value) cast no vote
    /// and add no weight. Each vote reads a bounded tail of its series.
    pub fn score(&self, feed: &dyn BarFeed, timeframe: Timeframe) -> Result<RegimeScore, FeedError> {
        let weights = self.config.weights;
        let mut votes = RegimeScore::default();

        for &period in &self.config.ma_periods {
            let ma_tf = ma_timeframe(feed, period, timeframe);
            if feed.bars(ma_tf)?.len() < period + 1 {
                continue;
            }
            let sma = feed.indicator_tail(ma_tf, IndicatorKind::MovingAverage, period, 2)?;
            if let [prior, current] = sma[..] {
                if !prior.is_nan() && !current.is_nan() {
                    votes.add(slope_sign(current - prior), weights.ma);
                }
            }
        }

        for &period in &self.config.adx_periods {
            if let Some(adx) = latest(feed, timeframe, IndicatorKind::TrendStrength, period)? {
                votes.add(adx / 100.0, weights.adx);
            }
        }

        for &period in &self.config.rsi_periods {
            if let Some(rsi) = latest(feed, timeframe, IndicatorKind::Momentum, period)? {
                votes.add((rsi - 50.0) / 50.0, weights.rsi);
            }
        }

        Ok(votes)
    }

    /// Fold `raw` into the smoothed score and classify the result.
    pub fn update(&mut self, raw: f64) -> RegimeSignal {
        let alpha = self.config.smoothing;
        self.smoothed = alpha * raw + (1.0 - alpha) * self.smoothed;
        self.classify()
    }

    /// Label and rounded strength for the current smoothed score.
    pub fn classify(&self) -> RegimeSignal {
        let label = if self.smoothed >= self.config.up_threshold {
            RegimeLabel::Uptrend
        } else if self.smoothed <= self.config.down_threshold {
            RegimeLabel::Downtrend
        } else {
            RegimeLabel::Neutral
        };
        RegimeSignal {
            label,
            strength: round3(self.smoothed),
        }
    }
}

/// Series an MA period is scored on: the `period`-minute timeframe when `feed`
/// carries it, otherwise `primary`.
pub fn ma_timeframe(feed: &dyn BarFeed, period: usize, primary: Timeframe) -> Timeframe {
    match u32::try_from(period).map(Timeframe::minutes) {
        Ok(tf) if feed.bars(tf).is_ok() => tf,
        _ => primary,
    }
}

fn latest(
    feed: &dyn BarFeed,
    timeframe: Timeframe,
    kind: IndicatorKind,
    period: usize,
) -> Result<Option<f64>, FeedError> {
    let tail = feed.indicator_tail(timeframe, kind, period, 1)?;
    Ok(tail.last().copied().filter(|v| !v.is_nan()))
}

/// -1, 0 or +1. Unlike `f64::signum`, zero maps to zero.
fn slope_sign(delta: f64) -> f64 {
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
