use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar period in minutes (1, 5, 15, 60, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe(pub u32);

impl Timeframe {
    pub const fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn as_minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}
