use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instrument metadata needed by the engines: symbol and tick size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub tick_size: f64,
    pub asset_class: AssetClass,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetClass {
    Equity,
    #[default]
    Future,
    Forex,
    Crypto,
}

impl Instrument {
    /// Create a new instrument, rejecting non-positive or non-finite tick sizes.
    pub fn new(
        symbol: impl Into<String>,
        tick_size: f64,
        asset_class: AssetClass,
    ) -> Result<Self, InstrumentError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(InstrumentError::EmptySymbol);
        }
        if !tick_size.is_finite() || tick_size <= 0.0 {
            return Err(InstrumentError::InvalidTickSize { tick_size });
        }
        Ok(Self {
            symbol,
            tick_size,
            asset_class,
        })
    }

    /// Price distance of `ticks` ticks.
    pub fn ticks(&self, ticks: f64) -> f64 {
        ticks * self.tick_size
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InstrumentError {
    #[error("instrument symbol must not be empty")]
    EmptySymbol,

    #[error("tick_size {tick_size} must be finite and positive")]
    InvalidTickSize { tick_size: f64 },
}
