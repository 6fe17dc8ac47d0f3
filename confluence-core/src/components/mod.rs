//! Analytic components evaluated on every primary bar close.
//!
//! Leaves first:
//! - News gate: scheduled-event blackout and breaking-news cooldown
//! - Swing structure engine: trailing-window extremes per timeframe
//! - Volume profile engine: POC and value area from binned volume
//! - Regime detector: smoothed indicator vote and trend label
//! - Signal fusion: combines the above into a trade signal
//!
//! Plus the indicator trait the bar feed evaluates on the detector's behalf.

pub mod fusion;
pub mod indicator;
pub mod news;
pub mod profile;
pub mod regime;
pub mod swing;

pub use fusion::{FusionReport, SignalFusion, Verdict};
pub use indicator::{Indicator, IndicatorKind};
pub use news::{Blocker, EventImpact, NewsEvent, NewsGate};
pub use profile::{ProfileKey, VolumeProfileEngine};
pub use regime::{RegimeDetector, RegimeScore};
pub use swing::SwingEngine;
