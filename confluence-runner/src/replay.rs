//! Historical replay: merge per-timeframe bar streams into bar-close order and
//! drive sessions with them, one instrument per rayon task.
//!
//! Sessions share nothing mutable, so instruments replay in parallel with the
//! same results as a sequential run.

use anyhow::Context;
use rayon::prelude::*;
use std::cmp::Reverse;
use tracing::info;

use confluence_core::domain::{Bar, Timeframe};

use crate::config::RunnerConfig;
use crate::data_loader::load_streams;
use crate::session::{Session, SessionError, SessionStats, SignalReport};
use crate::sink::JsonlSink;

/// A completed bar tagged with the timeframe it closed on.
#[derive(Debug, Clone, PartialEq)]
pub struct BarClose {
    pub timeframe: Timeframe,
    pub bar: Bar,
}

/// Interleave streams by close time. On equal timestamps the larger timeframe
/// comes first, so the primary bar is evaluated with higher-timeframe bars
/// closing at the same instant already in the feed.
pub fn merge_streams(streams: Vec<(Timeframe, Vec<Bar>)>) -> Vec<BarClose> {
    let mut events: Vec<BarClose> = streams
        .into_iter()
        .flat_map(|(timeframe, bars)| bars.into_iter().map(move |bar| BarClose { timeframe, bar }))
        .collect();
    events.sort_by_key(|e| (e.bar.timestamp, Reverse(e.timeframe)));
    events
}

/// What one instrument's replay produced.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub symbol: String,
    pub stats: SessionStats,
    pub signals: Vec<SignalReport>,
}

/// Feed `events` through `session` in order.
pub fn replay(
    session: &mut Session,
    events: impl IntoIterator<Item = BarClose>,
) -> Result<ReplaySummary, SessionError> {
    let mut signals = Vec::new();
    for event in events {
        if let Some(report) = session.on_bar_close(event.timeframe, event.bar)? {
            signals.push(report);
        }
    }
    let summary = ReplaySummary {
        symbol: session.symbol().to_string(),
        stats: session.stats(),
        signals,
    };
    info!(
        symbol = %summary.symbol,
        bars = summary.stats.bars,
        evaluations = summary.stats.evaluations,
        signals = summary.stats.signals,
        "replay finished"
    );
    Ok(summary)
}

/// One instrument's session and its merged bar stream.
pub struct ReplayJob {
    pub session: Session,
    pub events: Vec<BarClose>,
}

/// Replay every job in parallel. Results keep the input order.
pub fn replay_all(jobs: Vec<ReplayJob>) -> Vec<Result<ReplaySummary, SessionError>> {
    jobs.into_par_iter()
        .map(|mut job| replay(&mut job.session, job.events))
        .collect()
}

/// Load a TOML runner config, replay every session's CSV data, and log trades
/// to `<output_dir>/<symbol>.jsonl`.
pub fn replay_from_files(config_path: &std::path::Path) -> anyhow::Result<Vec<ReplaySummary>> {
    let config = RunnerConfig::load(config_path)
        .with_context(|| format!("loading runner config {}", config_path.display()))?;

    let mut jobs = Vec::with_capacity(config.sessions.len());
    for session_config in &config.sessions {
        let symbol = &session_config.instrument.symbol;
        let streams = load_streams(&session_config.data)
            .with_context(|| format!("loading bars for {symbol}"))?;
        let sink = JsonlSink::new(config.output_dir.join(format!("{symbol}.jsonl")));
        let session = Session::new(session_config, Box::new(sink))
            .with_context(|| format!("creating session for {symbol}"))?;
        jobs.push(ReplayJob {
            session,
            events: merge_streams(streams),
        });
    }

    replay_all(jobs)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .context("replay failed")
}
