//! Signal fusion: combines the news gate, regime, swing structure and volume
//! profile into a directional signal with fixed-offset stop and target.
//!
//! Evaluation order, stopping at the first step that rules a trade out:
//! 1. news gate closed at the bar timestamp
//! 2. neutral regime
//! 3. no swing high or no swing low on the primary timeframe
//! 4. breakout beyond the outermost swing level by the relative threshold
//! 5. confluence: close within tolerance of VAL (long) or VAH (short)
//!
//! Stop and target are derived from the bar alone and filled on every outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig, FusionConfig};
use crate::data::{BarFeed, FeedError};
use crate::domain::{
    Bar, Direction, Instrument, RegimeLabel, RegimeSignal, SwingKind, SwingLevel, Timeframe,
    TradeSignal, VolumeZone, ZoneKind,
};

use super::news::NewsGate;
use super::profile::{zone_price, VolumeProfileEngine};
use super::regime::RegimeDetector;
use super::swing::SwingEngine;

/// Stop distance below the signal bar's low.
pub const STOP_OFFSET_TICKS: f64 = 4.0;
/// Target distance above the signal bar's high.
pub const TARGET_OFFSET_TICKS: f64 = 8.0;

/// Outcome of one fusion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NewsBlocked,
    NeutralRegime,
    MissingSwings,
    NoBreakout,
    NoConfluence,
    Long,
    Short,
}

impl Verdict {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Verdict::Long => Some(Direction::Long),
            Verdict::Short => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::NewsBlocked => "news_blocked",
            Verdict::NeutralRegime => "neutral_regime",
            Verdict::MissingSwings => "missing_swings",
            Verdict::NoBreakout => "no_breakout",
            Verdict::NoConfluence => "no_confluence",
            Verdict::Long => "long",
            Verdict::Short => "short",
        };
        f.write_str(s)
    }
}

/// Everything one fusion pass looked at.
///
/// `regime` is `None` when the news gate stopped evaluation before the detector
/// ran; `swings` and `zones` are empty when evaluation stopped before they were
/// computed. `swings` holds the retained levels for every configured timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionReport {
    pub signal: TradeSignal,
    pub regime: Option<RegimeSignal>,
    pub swings: Vec<SwingLevel>,
    pub zones: Vec<VolumeZone>,
    pub verdict: Verdict,
}

/// Per-instrument signal pipeline. Owns the regime state and profile buffers.
#[derive(Debug, Clone)]
pub struct SignalFusion {
    config: EngineConfig,
    news: NewsGate,
    regime: RegimeDetector,
    swing: SwingEngine,
    profile: VolumeProfileEngine,
}

impl SignalFusion {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            news: NewsGate::new(),
            regime: RegimeDetector::new(config.regime.clone())?,
            swing: SwingEngine::new(config.swing.clone())?,
            profile: VolumeProfileEngine::new(config.profile.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn news(&self) -> &NewsGate {
        &self.news
    }

    /// Scheduled events and breaking-news flags are fed through here.
    pub fn news_mut(&mut self) -> &mut NewsGate {
        &mut self.news
    }

    pub fn regime(&self) -> &RegimeDetector {
        &self.regime
    }

    /// Evaluate the closing primary bar `bar`.
    pub fn evaluate(&mut self, feed: &dyn BarFeed, bar: &Bar) -> Result<TradeSignal, FeedError> {
        Ok(self.evaluate_detailed(feed, bar)?.signal)
    }

    /// Evaluate `bar` and return the inputs behind the decision.
    ///
    /// Swing levels are measured on bars strictly before `bar`, so `bar` may
    /// already be in the feed or not. Regime and profile read the feed as is.
    pub fn evaluate_detailed(
        &mut self,
        feed: &dyn BarFeed,
        bar: &Bar,
    ) -> Result<FusionReport, FeedError> {
        let (stop, target) = stop_and_target(bar, feed.instrument());
        let primary = self.config.primary;
        let mut report = FusionReport {
            signal: TradeSignal::flat(stop, target),
            regime: None,
            swings: Vec::new(),
            zones: Vec::new(),
            verdict: Verdict::NewsBlocked,
        };

        if let Some(blocker) = self.news.blocker(bar.timestamp) {
            debug!(at = %bar.timestamp, ?blocker, "fusion: news gate closed");
            return Ok(report);
        }

        let regime = self.regime.current_regime(feed, primary)?;
        report.regime = Some(regime);
        if regime.label == RegimeLabel::Neutral {
            report.verdict = Verdict::NeutralRegime;
            return Ok(report);
        }

        report.swings =
            self.swing
                .calculate_swings_before(feed, &self.config.timeframes, bar.timestamp)?;
        report.zones = self.profile.compute_profile(feed, primary)?;
        report.verdict = decide(
            bar.close,
            regime.label,
            &report.swings,
            primary,
            &report.zones,
            &self.config.fusion,
        );

        match report.verdict.direction() {
            Some(direction) => {
                report.signal.go_long = direction == Direction::Long;
                report.signal.go_short = direction == Direction::Short;
                info!(
                    symbol = %feed.instrument().symbol,
                    at = %bar.timestamp,
                    ?direction,
                    close = bar.close,
                    stop,
                    target,
                    strength = regime.strength,
                    "fusion: signal"
                );
            }
            None => {
                debug!(at = %bar.timestamp, verdict = %report.verdict, "fusion: flat");
            }
        }
        Ok(report)
    }
}

/// `(bar.low − 4 ticks, bar.high + 8 ticks)`.
pub fn stop_and_target(bar: &Bar, instrument: &Instrument) -> (f64, f64) {
    (
        bar.low - instrument.ticks(STOP_OFFSET_TICKS),
        bar.high + instrument.ticks(TARGET_OFFSET_TICKS),
    )
}

/// Apply the regime, swing, breakout and confluence tests to `close`.
///
/// Only swings on `primary` are considered. Missing VAH/VAL fall back to
/// `close`, which always satisfies the confluence test.
pub fn decide(
    close: f64,
    regime: RegimeLabel,
    swings: &[SwingLevel],
    primary: Timeframe,
    zones: &[VolumeZone],
    config: &FusionConfig,
) -> Verdict {
    let Some(direction) = regime.direction() else {
        return Verdict::NeutralRegime;
    };

    let on_primary = swings.iter().filter(|s| s.timeframe == primary);
    let swing_high = on_primary
        .clone()
        .filter(|s| s.kind == SwingKind::SwingHigh)
        .map(|s| s.price)
        .reduce(f64::max);
    let swing_low = on_primary
        .filter(|s| s.kind == SwingKind::SwingLow)
        .map(|s| s.price)
        .reduce(f64::min);
    let (Some(high), Some(low)) = (swing_high, swing_low) else {
        return Verdict::MissingSwings;
    };

    let vah = zone_price(zones, ZoneKind::Vah).unwrap_or(close);
    let val = zone_price(zones, ZoneKind::Val).unwrap_or(close);

    let (breakout, confluence) = match direction {
        Direction::Long => (
            close > high * (1.0 + config.breakout_threshold),
            (close - val).abs() / val < config.confluence_tolerance,
        ),
        Direction::Short => (
            close < low * (1.0 - config.breakout_threshold),
            (close - vah).abs() / vah < config.confluence_tolerance,
        ),
    };

    match (breakout, confluence, direction) {
        (false, _, _) => Verdict::NoBreakout,
        (true, false, _) => Verdict::NoConfluence,
        (true, true, Direction::Long) => Verdict::Long,
        (true, true, Direction::Short) => Verdict::Short,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetClass;
    use crate::indicators::make_ohlc_bars;

    fn m1() -> Timeframe {
        Timeframe::minutes(1)
    }

    fn swings(high: f64, low: f64) -> Vec<SwingLevel> {
        vec![
            SwingLevel::new(high, m1(), SwingKind::SwingHigh),
            SwingLevel::new(low, m1(), SwingKind::SwingLow),
        ]
    }

    fn zones(poc: f64, vah: f64, val: f64) -> Vec<VolumeZone> {
        vec![
            VolumeZone { price: poc, kind: ZoneKind::Poc, volume: 1.0 },
            VolumeZone { price: vah, kind: ZoneKind::Vah, volume: 1.0 },
            VolumeZone { price: val, kind: ZoneKind::Val, volume: 1.0 },
        ]
    }

    #[test]
    fn uptrend_breakout_without_zones_goes_long() {
        let cfg = FusionConfig::default();
        let v = decide(101.0, RegimeLabel::Uptrend, &swings(100.0, 95.0), m1(), &[], &cfg);
        assert_eq!(v, Verdict::Long);
    }

    #[test]
    fn downtrend_breakdown_without_zones_goes_short() {
        let cfg = FusionConfig::default();
        let v = decide(94.0, RegimeLabel::Downtrend, &swings(100.0, 95.0), m1(), &[], &cfg);
        assert_eq!(v, Verdict::Short);
    }

    #[test]
    fn neutral_regime_is_flat() {
        let cfg = FusionConfig::default();
        let v = decide(101.0, RegimeLabel::Neutral, &swings(100.0, 95.0), m1(), &[], &cfg);
        assert_eq!(v, Verdict::NeutralRegime);
    }

    #[test]
    fn breakout_threshold_is_strict() {
        let cfg = FusionConfig::default();
        // 100 × 1.001 = 100.1: touching is not breaking out.
        let v = decide(100.05, RegimeLabel::Uptrend, &swings(100.0, 95.0), m1(), &[], &cfg);
        assert_eq!(v, Verdict::NoBreakout);
    }

    #[test]
    fn uses_outermost_primary_levels() {
        let cfg = FusionConfig::default();
        let mut levels = swings(100.0, 95.0);
        levels.push(SwingLevel::new(103.0, m1(), SwingKind::SwingHigh));
        levels.push(SwingLevel::new(200.0, Timeframe::minutes(5), SwingKind::SwingHigh));
        assert_eq!(
            decide(101.0, RegimeLabel::Uptrend, &levels, m1(), &[], &cfg),
            Verdict::NoBreakout
        );
        assert_eq!(
            decide(104.0, RegimeLabel::Uptrend, &levels, m1(), &[], &cfg),
            Verdict::Long
        );
    }

    #[test]
    fn other_timeframes_do_not_count() {
        let cfg = FusionConfig::default();
        let m5 = Timeframe::minutes(5);
        let levels = vec![
            SwingLevel::new(100.0, m5, SwingKind::SwingHigh),
            SwingLevel::new(95.0, m5, SwingKind::SwingLow),
        ];
        assert_eq!(
            decide(101.0, RegimeLabel::Uptrend, &levels, m1(), &[], &cfg),
            Verdict::MissingSwings
        );
    }

    #[test]
    fn needs_both_swing_kinds() {
        let cfg = FusionConfig::default();
        let highs_only = vec![
            SwingLevel::new(100.0, m1(), SwingKind::SwingHigh),
            SwingLevel::new(99.0, m1(), SwingKind::SwingHigh),
        ];
        assert_eq!(
            decide(101.0, RegimeLabel::Uptrend, &highs_only, m1(), &[], &cfg),
            Verdict::MissingSwings
        );
    }

    #[test]
    fn long_needs_close_near_val() {
        let cfg = FusionConfig::default();
        let far = zones(98.0, 99.0, 97.0);
        assert_eq!(
            decide(101.0, RegimeLabel::Uptrend, &swings(100.0, 95.0), m1(), &far, &cfg),
            Verdict::NoConfluence
        );
        let near = zones(100.0, 100.9, 100.95);
        assert_eq!(
            decide(101.0, RegimeLabel::Uptrend, &swings(100.0, 95.0), m1(), &near, &cfg),
            Verdict::Long
        );
    }

    #[test]
    fn short_needs_close_near_vah() {
        let cfg = FusionConfig::default();
        let near = zones(95.0, 94.05, 93.0);
        assert_eq!(
            decide(94.0, RegimeLabel::Downtrend, &swings(100.0, 95.0), m1(), &near, &cfg),
            Verdict::Short
        );
    }

    #[test]
    fn stop_and_target_use_ticks() {
        let es = Instrument::new("ES", 0.25, AssetClass::Future).unwrap();
        let bar = make_ohlc_bars(&[(100.0, 101.5, 99.5, 101.0)]).remove(0);
        assert_eq!(stop_and_target(&bar, &es), (98.5, 103.5));
    }

    #[test]
    fn verdict_direction() {
        assert_eq!(Verdict::Long.direction(), Some(Direction::Long));
        assert_eq!(Verdict::Short.direction(), Some(Direction::Short));
        assert_eq!(Verdict::NoConfluence.direction(), None);
        assert_eq!(Verdict::NewsBlocked.to_string(), "news_blocked");
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = EngineConfig {
            timeframes: vec![Timeframe::minutes(5)],
            ..EngineConfig::default()
        };
        assert!(SignalFusion::new(cfg).is_err());
    }
}
