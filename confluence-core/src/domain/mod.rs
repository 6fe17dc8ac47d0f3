//! Domain types: bars, bar series, instruments, timeframes, and the values the engines emit.

pub mod bar;
pub mod instrument;
pub mod levels;
pub mod timeframe;

pub use bar::{Bar, BarError, BarSeries};
pub use instrument::{AssetClass, Instrument, InstrumentError};
pub use levels::{
    Direction, RegimeLabel, RegimeSignal, SwingKind, SwingLevel, TradeSignal, VolumeZone, ZoneKind,
};
pub use timeframe::Timeframe;

/// Symbol type alias
pub type Symbol = String;
