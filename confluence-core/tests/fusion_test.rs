//! End-to-end fusion scenarios over an in-memory feed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use confluence_core::components::{EventImpact, NewsEvent, SignalFusion, Verdict};
use confluence_core::config::{EngineConfig, RegimeConfig, SwingConfig};
use confluence_core::data::{FeedError, MemoryFeed};
use confluence_core::domain::{AssetClass, Bar, Instrument, RegimeLabel, Timeframe};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 7, 13, 0, 0).unwrap()
}

fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: start() + Duration::minutes(i),
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// 30 one-minute bars climbing 0.2 per bar from 94.0; the last high is 100.0.
fn climbing_history() -> Vec<Bar> {
    (0..30)
        .map(|i| {
            let close = 94.0 + 0.2 * i as f64;
            bar(i, close, close + 0.2, close - 0.2, close)
        })
        .collect()
}

/// 30 one-minute bars falling 0.2 per bar from 106.0; the last low is 100.0.
fn falling_history() -> Vec<Bar> {
    (0..30)
        .map(|i| {
            let close = 106.0 - 0.2 * i as f64;
            bar(i, close, close + 0.2, close - 0.2, close)
        })
        .collect()
}

fn config() -> EngineConfig {
    let m1 = Timeframe::minutes(1);
    EngineConfig {
        primary: m1,
        timeframes: vec![m1],
        swing: SwingConfig {
            lookbacks: vec![20],
            ..SwingConfig::default()
        },
        regime: RegimeConfig {
            ma_periods: vec![5],
            adx_periods: vec![],
            rsi_periods: vec![],
            ..RegimeConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn feed(history: Vec<Bar>) -> MemoryFeed {
    let es = Instrument::new("ES", 0.25, AssetClass::Future).unwrap();
    let m1 = Timeframe::minutes(1);
    let mut feed = MemoryFeed::new(es, &[m1]).unwrap();
    feed.extend(m1, history).unwrap();
    feed
}

#[test]
fn uptrend_breakout_goes_long_with_fixed_offsets() {
    let mut feed = feed(climbing_history());
    let signal_bar = bar(30, 100.0, 101.25, 99.75, 101.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(config()).unwrap();
    let report = fusion.evaluate_detailed(&feed, &signal_bar).unwrap();

    assert_eq!(report.verdict, Verdict::Long);
    assert_eq!(report.regime.unwrap().label, RegimeLabel::Uptrend);
    assert!(report.zones.is_empty(), "window of 50 not yet filled");
    assert!(report.signal.go_long);
    assert!(!report.signal.go_short);
    assert_eq!(report.signal.stop, 99.75 - 1.0);
    assert_eq!(report.signal.target, 101.25 + 2.0);
}

#[test]
fn downtrend_breakdown_goes_short() {
    let mut feed = feed(falling_history());
    let signal_bar = bar(30, 100.0, 100.25, 98.75, 99.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(config()).unwrap();
    let signal = fusion.evaluate(&feed, &signal_bar).unwrap();
    assert!(signal.go_short);
    assert!(!signal.go_long);
}

#[test]
fn signal_bar_need_not_be_in_feed() {
    let feed = feed(climbing_history());
    let signal_bar = bar(30, 100.0, 101.25, 99.75, 101.0);
    let mut fusion = SignalFusion::new(config()).unwrap();
    // Regime reads history only: SMA(5) is still rising.
    assert!(fusion.evaluate(&feed, &signal_bar).unwrap().go_long);
}

#[test]
fn high_impact_window_forces_flat() {
    let mut feed = feed(climbing_history());
    let signal_bar = bar(30, 100.0, 101.25, 99.75, 101.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(config()).unwrap();
    fusion.news_mut().add_scheduled(NewsEvent {
        start: signal_bar.timestamp + Duration::minutes(4),
        end: signal_bar.timestamp + Duration::minutes(6),
        impact: EventImpact::High,
        description: "FOMC statement".into(),
    });

    let report = fusion.evaluate_detailed(&feed, &signal_bar).unwrap();
    assert_eq!(report.verdict, Verdict::NewsBlocked);
    assert!(report.signal.is_flat());
    assert_eq!(report.signal.stop, 98.75);
    assert_eq!(report.signal.target, 103.25);
    assert!(report.regime.is_none());
    assert_eq!(fusion.regime().smoothed(), 0.0, "regime not advanced while blocked");
}

#[test]
fn breaking_news_cooldown_forces_flat() {
    let mut feed = feed(climbing_history());
    let signal_bar = bar(30, 100.0, 101.25, 99.75, 101.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(config()).unwrap();
    fusion
        .news_mut()
        .on_breaking_news(signal_bar.timestamp - Duration::seconds(90));
    assert!(fusion.evaluate(&feed, &signal_bar).unwrap().is_flat());
}

#[test]
fn close_inside_range_is_flat() {
    let mut feed = feed(climbing_history());
    let signal_bar = bar(30, 99.8, 100.05, 99.5, 100.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(config()).unwrap();
    let report = fusion.evaluate_detailed(&feed, &signal_bar).unwrap();
    assert_eq!(report.verdict, Verdict::NoBreakout);
    assert!(report.signal.is_flat());
    assert_eq!(report.swings.len(), 2);
}

#[test]
fn warming_up_is_flat_not_an_error() {
    let history: Vec<Bar> = climbing_history().into_iter().take(4).collect();
    let signal_bar = history[3].clone();
    let feed = feed(history);

    let mut fusion = SignalFusion::new(config()).unwrap();
    let report = fusion.evaluate_detailed(&feed, &signal_bar).unwrap();
    assert!(report.signal.is_flat());
    assert_eq!(report.verdict, Verdict::NeutralRegime);
}

#[test]
fn rising_market_smooths_toward_one() {
    let mut feed = feed(climbing_history());
    let m1 = Timeframe::minutes(1);
    let mut fusion = SignalFusion::new(config()).unwrap();

    let mut previous = 0.0;
    for i in 30..60 {
        let close = 94.0 + 0.2 * i as f64;
        let next = bar(i, close, close + 0.2, close - 0.2, close);
        feed.push(m1, next.clone()).unwrap();
        fusion.evaluate(&feed, &next).unwrap();

        let smoothed = fusion.regime().smoothed();
        assert!(smoothed > previous);
        assert!(smoothed < 1.0);
        previous = smoothed;
    }
}

#[test]
fn unconfigured_timeframe_propagates() {
    let mut cfg = config();
    cfg.timeframes.push(Timeframe::minutes(5));

    let mut feed = feed(climbing_history());
    let signal_bar = bar(30, 100.0, 101.25, 99.75, 101.0);
    feed.push(Timeframe::minutes(1), signal_bar.clone()).unwrap();

    let mut fusion = SignalFusion::new(cfg).unwrap();
    let err = fusion.evaluate(&feed, &signal_bar).unwrap_err();
    assert_eq!(err, FeedError::UnknownTimeframe(Timeframe::minutes(5)));
}
