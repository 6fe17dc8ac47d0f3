//! Values produced by the engines on each evaluation.
//!
//! All of these are recomputed per bar close; none carry state between calls.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Timeframe;

/// Which side of the range a swing level marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    SwingHigh,
    SwingLow,
}

/// A trailing-window price extremum on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingLevel {
    pub price: f64,
    pub timeframe: Timeframe,
    pub kind: SwingKind,
    /// Number of candidates merged into this level.
    pub count: u32,
}

impl SwingLevel {
    pub fn new(price: f64, timeframe: Timeframe, kind: SwingKind) -> Self {
        Self {
            price,
            timeframe,
            kind,
            count: 1,
        }
    }

    /// Sort key where larger means more extreme for the level's kind.
    pub fn extremeness(&self) -> f64 {
        match self.kind {
            SwingKind::SwingHigh => self.price,
            SwingKind::SwingLow => -self.price,
        }
    }
}

/// Volume profile landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Point of Control: the bin with the highest smoothed volume.
    Poc,
    /// Value Area High.
    Vah,
    /// Value Area Low.
    Val,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneKind::Poc => write!(f, "POC"),
            ZoneKind::Vah => write!(f, "VAH"),
            ZoneKind::Val => write!(f, "VAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeZone {
    pub price: f64,
    pub kind: ZoneKind,
    pub volume: f64,
}

/// Discrete trend regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeLabel {
    Uptrend,
    Neutral,
    Downtrend,
}

impl RegimeLabel {
    /// The trade direction this regime permits, if any.
    pub fn direction(self) -> Option<Direction> {
        match self {
            RegimeLabel::Uptrend => Some(Direction::Long),
            RegimeLabel::Downtrend => Some(Direction::Short),
            RegimeLabel::Neutral => None,
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeLabel::Uptrend => write!(f, "Uptrend"),
            RegimeLabel::Neutral => write!(f, "Neutral"),
            RegimeLabel::Downtrend => write!(f, "Downtrend"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSignal {
    pub label: RegimeLabel,
    /// Smoothed score rounded to 3 decimals, in [-1, 1].
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// Output of one fusion pass.
///
/// `stop` and `target` are filled on every pass, including flat ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub go_long: bool,
    pub go_short: bool,
    pub stop: f64,
    pub target: f64,
}

impl TradeSignal {
    pub fn flat(stop: f64, target: f64) -> Self {
        Self {
            go_long: false,
            go_short: false,
            stop,
            target,
        }
    }

    pub fn is_flat(&self) -> bool {
        !self.go_long && !self.go_short
    }

    pub fn direction(&self) -> Option<Direction> {
        if self.go_long {
            Some(Direction::Long)
        } else if self.go_short {
            Some(Direction::Short)
        } else {
            None
        }
    }
}
