//! Confluence Runner: bar-close orchestration around `confluence-core`.
//!
//! This crate provides:
//! - TOML runner configuration (one session per instrument)
//! - CSV bar loading with sanity filtering
//! - Bar-close sessions with warm-up gating and trade metadata
//! - Analytics sinks (JSONL trade log, in-memory)
//! - Multi-timeframe stream merging and parallel multi-instrument replay
//! - Tracing subscriber setup

pub mod config;
pub mod data_loader;
pub mod replay;
pub mod session;
pub mod sink;
pub mod telemetry;

pub use config::{BarFileSpec, RunnerConfig, RunnerConfigError, SessionConfig};
pub use data_loader::{load_bars, load_streams, read_bars, LoadError, LoadedBars};
pub use replay::{merge_streams, replay, replay_all, replay_from_files, BarClose, ReplayJob, ReplaySummary};
pub use session::{Session, SessionError, SessionStats, SignalReport};
pub use sink::{AnalyticsSink, JsonlSink, MemorySink, SinkError, TradeRecord};
pub use telemetry::init_tracing;
