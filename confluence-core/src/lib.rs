//! Confluence Core: bar-close signal engines for multi-timeframe futures trading.
//!
//! This crate contains the analytic heart of the system:
//! - Domain types (bars, bar series, instruments, timeframes, levels, signals)
//! - Bar feed abstraction with an in-memory multi-timeframe implementation
//! - Reference indicators (SMA, ADX, RSI) behind the `Indicator` trait
//! - Swing structure, volume profile and regime engines
//! - News gate and signal fusion
//! - Validated configuration with a deterministic fingerprint

pub mod components;
pub mod config;
pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
