//! Bar-close session: one instrument's feed, engines and sink.
//!
//! Every completed bar on any configured timeframe is appended to the feed.
//! Primary-timeframe bars past the warm-up gate run a fusion pass; a directional
//! outcome becomes a `SignalReport` for the caller and a `TradeRecord` for the
//! analytics sink. Sink failures are logged and swallowed.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use confluence_core::components::{NewsGate, SignalFusion, Verdict};
use confluence_core::config::ConfigError;
use confluence_core::data::{BarFeed, FeedError, MemoryFeed};
use confluence_core::domain::{Bar, Direction, RegimeSignal, Timeframe, TradeSignal};
use confluence_core::fingerprint::ConfigHash;

use crate::config::SessionConfig;
use crate::sink::{AnalyticsSink, TradeRecord};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
}

/// A fired signal plus the metadata the execution layer logs with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReport {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub signal: TradeSignal,
    pub regime: RegimeSignal,
    pub swing_count: usize,
    pub zone_count: usize,
}

/// Counters over a session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bars: usize,
    pub evaluations: usize,
    pub signals: usize,
    pub sink_failures: usize,
}

pub struct Session {
    feed: MemoryFeed,
    fusion: SignalFusion,
    sink: Box<dyn AnalyticsSink>,
    config_hash: ConfigHash,
    bars_required: usize,
    primary_bars: usize,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: &SessionConfig, sink: Box<dyn AnalyticsSink>) -> Result<Self, SessionError> {
        config.validate()?;
        let feed = MemoryFeed::new(config.instrument.clone(), &config.engine.timeframes)?
            .with_retention(config.engine.retained_bars());
        let mut fusion = SignalFusion::new(config.engine.clone())?;
        for event in &config.news {
            fusion.news_mut().add_scheduled(event.clone());
        }
        let config_hash = config.fingerprint()?;
        debug!(
            symbol = %config.instrument.symbol,
            config = config_hash.short(),
            bars_required = config.engine.bars_required(),
            retained = config.engine.retained_bars(),
            "session created"
        );
        Ok(Self {
            feed,
            fusion,
            sink,
            config_hash,
            bars_required: config.engine.bars_required(),
            primary_bars: 0,
            stats: SessionStats::default(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.feed.instrument().symbol
    }

    pub fn feed(&self) -> &MemoryFeed {
        &self.feed
    }

    pub fn news_mut(&mut self) -> &mut NewsGate {
        self.fusion.news_mut()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    /// Handle a completed bar on `timeframe`.
    ///
    /// Returns the report when a primary bar close fires a signal. Primary bars
    /// are evaluated once their 0-based index reaches the warm-up requirement.
    /// The index counts every primary bar seen, including ones the feed has
    /// since dropped.
    pub fn on_bar_close(
        &mut self,
        timeframe: Timeframe,
        bar: Bar,
    ) -> Result<Option<SignalReport>, SessionError> {
        self.feed.push(timeframe, bar.clone())?;
        self.stats.bars += 1;

        let primary = self.fusion.config().primary;
        if timeframe != primary {
            return Ok(None);
        }
        let index = self.primary_bars;
        self.primary_bars += 1;
        if index < self.bars_required {
            return Ok(None);
        }

        self.stats.evaluations += 1;
        let report = self.fusion.evaluate_detailed(&self.feed, &bar)?;
        let (Some(direction), Some(regime)) = (report.verdict.direction(), report.regime) else {
            return Ok(None);
        };

        let signal_report = SignalReport {
            timestamp: bar.timestamp,
            symbol: self.symbol().to_string(),
            direction,
            entry: bar.close,
            signal: report.signal,
            regime,
            swing_count: report.swings.len(),
            zone_count: report.zones.len(),
        };
        self.stats.signals += 1;
        info!(
            symbol = %signal_report.symbol,
            at = %signal_report.timestamp,
            ?direction,
            entry = signal_report.entry,
            stop = signal_report.signal.stop,
            target = signal_report.signal.target,
            regime = %regime.label,
            swings = signal_report.swing_count,
            zones = signal_report.zone_count,
            "session: trade signal"
        );

        let record = self.trade_record(&signal_report, report.verdict);
        if let Err(e) = self.sink.record(&record) {
            self.stats.sink_failures += 1;
            warn!(symbol = %signal_report.symbol, error = %e, "analytics sink rejected trade record");
        }
        Ok(Some(signal_report))
    }

    fn trade_record(&self, report: &SignalReport, verdict: Verdict) -> TradeRecord {
        TradeRecord {
            timestamp: report.timestamp,
            symbol: report.symbol.clone(),
            direction: report.direction,
            entry: report.entry,
            stop: report.signal.stop,
            target: report.signal.target,
            regime: report.regime.label,
            regime_strength: report.regime.strength,
            swing_count: report.swing_count,
            zone_count: report.zone_count,
            verdict,
            config_hash: self.config_hash.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, SinkError};
    use chrono::{Duration, TimeZone};
    use confluence_core::config::{EngineConfig, RegimeConfig, SwingConfig};
    use confluence_core::domain::{AssetClass, Instrument};

    struct FailingSink;

    impl AnalyticsSink for FailingSink {
        fn record(&mut self, _record: &TradeRecord) -> Result<(), SinkError> {
            Err(SinkError::Poisoned)
        }
    }

    fn config() -> SessionConfig {
        let m1 = Timeframe::minutes(1);
        let es = Instrument::new("ES", 0.25, AssetClass::Future).unwrap();
        SessionConfig::new(
            es,
            EngineConfig {
                primary: m1,
                timeframes: vec![m1, Timeframe::minutes(5)],
                swing: SwingConfig {
                    lookbacks: vec![10],
                    ..SwingConfig::default()
                },
                regime: RegimeConfig {
                    ma_periods: vec![3],
                    adx_periods: vec![],
                    rsi_periods: vec![],
                    ..RegimeConfig::default()
                },
                ..EngineConfig::default()
            },
        )
    }

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 7, 13, 0, 0).unwrap() + Duration::minutes(i),
            open,
            high,
            low,
            close,
            volume: 500,
        }
    }

    /// 20 climbing bars (high of the last = 100.0) then a breakout bar closing at 101.
    fn breakout_sequence() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..20)
            .map(|i| {
                let close = 96.0 + 0.2 * i as f64;
                bar(i, close, close + 0.2, close - 0.2, close)
            })
            .collect();
        bars.push(bar(20, 99.8, 101.25, 99.75, 101.0));
        bars
    }

    #[test]
    fn warm_up_gate_uses_bar_index() {
        let mut session = Session::new(&config(), Box::new(MemorySink::new())).unwrap();
        // bars_required = 10 + 5 = 15: indices 0..=14 are never evaluated.
        for b in breakout_sequence().into_iter().take(15) {
            session.on_bar_close(Timeframe::minutes(1), b).unwrap();
        }
        assert_eq!(session.stats().evaluations, 0);

        let next = breakout_sequence().remove(15);
        session.on_bar_close(Timeframe::minutes(1), next).unwrap();
        assert_eq!(session.stats().evaluations, 1);
    }

    #[test]
    fn breakout_fires_and_records() {
        let sink = MemorySink::new();
        let mut session = Session::new(&config(), Box::new(sink.clone())).unwrap();

        let mut fired = None;
        for b in breakout_sequence() {
            if let Some(report) = session.on_bar_close(Timeframe::minutes(1), b).unwrap() {
                fired = Some(report);
            }
        }

        let report = fired.expect("breakout bar should fire");
        assert_eq!(report.direction, Direction::Long);
        assert_eq!(report.entry, 101.0);
        assert_eq!(report.signal.stop, 98.75);
        assert_eq!(report.signal.target, 103.25);
        assert_eq!(report.swing_count, 2);
        assert_eq!(report.zone_count, 0);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "ES");
        assert_eq!(&records[0].config_hash, session.config_hash());
        assert_eq!(session.stats().signals, 1);
    }

    #[test]
    fn non_primary_bars_only_feed_history() {
        let mut session = Session::new(&config(), Box::new(MemorySink::new())).unwrap();
        let m5 = Timeframe::minutes(5);
        for i in 0..30 {
            let close = 100.0 + i as f64;
            let out = session
                .on_bar_close(m5, bar(5 * i, close, close + 1.0, close - 1.0, close))
                .unwrap();
            assert!(out.is_none());
        }
        assert_eq!(session.feed().bars(m5).unwrap().len(), 30);
        assert_eq!(session.stats().evaluations, 0);
    }

    #[test]
    fn sink_failure_does_not_propagate() {
        let mut session = Session::new(&config(), Box::new(FailingSink)).unwrap();
        let mut fired = 0;
        for b in breakout_sequence() {
            if session.on_bar_close(Timeframe::minutes(1), b).unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(session.stats().sink_failures, 1);
    }

    #[test]
    fn scheduled_news_suppresses_signal() {
        let mut cfg = config();
        let at = breakout_sequence()[20].timestamp;
        cfg.news.push(confluence_core::components::NewsEvent {
            start: at,
            end: at + Duration::minutes(1),
            impact: confluence_core::components::EventImpact::High,
            description: "CPI".into(),
        });
        let mut session = Session::new(&cfg, Box::new(MemorySink::new())).unwrap();
        for b in breakout_sequence() {
            assert!(session.on_bar_close(Timeframe::minutes(1), b).unwrap().is_none());
        }
    }

    #[test]
    fn long_session_keeps_bounded_history() {
        let mut session = Session::new(&config(), Box::new(MemorySink::new())).unwrap();
        let m1 = Timeframe::minutes(1);
        // Profile window 50 dominates swing 10 + 1 and the SMA(3) tail.
        let cap = config().engine.retained_bars();
        assert_eq!(cap, 50);

        for i in 0..3000 {
            let close = 100.0 + (i as f64 * 0.05).sin() * 3.0;
            session
                .on_bar_close(m1, bar(i, close, close + 0.5, close - 0.5, close))
                .unwrap();
            assert!(session.feed().bars(m1).unwrap().len() < 2 * cap);
        }
        assert_eq!(session.stats().bars, 3000);
        assert_eq!(session.stats().evaluations, 3000 - 15);
    }

    #[test]
    fn unknown_timeframe_is_error() {
        let mut session = Session::new(&config(), Box::new(MemorySink::new())).unwrap();
        let err = session
            .on_bar_close(Timeframe::minutes(60), bar(0, 100.0, 101.0, 99.0, 100.0))
            .unwrap_err();
        assert!(matches!(err, SessionError::Feed(FeedError::UnknownTimeframe(_))));
    }

    #[test]
    fn out_of_order_bar_is_error() {
        let mut session = Session::new(&config(), Box::new(MemorySink::new())).unwrap();
        let m1 = Timeframe::minutes(1);
        session.on_bar_close(m1, bar(5, 100.0, 101.0, 99.0, 100.0)).unwrap();
        assert!(session.on_bar_close(m1, bar(4, 100.0, 101.0, 99.0, 100.0)).is_err());
    }

    #[test]
    fn invalid_config_rejected() {
        let mut cfg = config();
        cfg.engine.timeframes = vec![Timeframe::minutes(5)];
        assert!(matches!(
            Session::new(&cfg, Box::new(MemorySink::new())),
            Err(SessionError::Config(_))
        ));
    }
}
