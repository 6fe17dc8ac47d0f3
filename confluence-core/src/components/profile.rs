//! Volume profile engine: POC and value area over a trailing bar window.
//!
//! Algorithm:
//! 1. Split the window's `[low, high]` range into `bins` equal-width bins
//! 2. Add each bar's volume to the bin holding its close (clamped into range)
//! 3. Smooth with a centred 3-point mean (2-point at the edges)
//! 4. POC = first bin with the maximum smoothed volume, priced at its midpoint
//! 5. Walk bins by smoothed volume, descending, until the value-area fraction of
//!    total volume is reached; VAH/VAL start at POC and widen to the outermost
//!    included midpoints
//!
//! Raw bin totals are written into a scratch buffer owned per (symbol, timeframe).
//! The buffer is zeroed on every call; it exists only to avoid reallocating.

use std::collections::HashMap;
use tracing::debug;

use crate::config::{ConfigError, ProfileConfig};
use crate::data::{BarFeed, FeedError};
use crate::domain::{Bar, Symbol, Timeframe, VolumeZone, ZoneKind};

use super::swing::window_extremes;

/// Scratch buffer key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone)]
pub struct VolumeProfileEngine {
    config: ProfileConfig,
    scratch: HashMap<ProfileKey, Vec<f64>>,
}

impl VolumeProfileEngine {
    pub fn new(config: ProfileConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            scratch: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Profile of the trailing window on `timeframe`: POC, VAH, VAL, or nothing.
    pub fn compute_profile(
        &mut self,
        feed: &dyn BarFeed,
        timeframe: Timeframe,
    ) -> Result<Vec<VolumeZone>, FeedError> {
        let series = feed.bars(timeframe)?;
        let Some(window) = series.trailing(self.config.window) else {
            debug!(timeframe = %timeframe, bars = series.len(), window = self.config.window, "volume profile skipped: warming up");
            return Ok(Vec::new());
        };

        let key = ProfileKey {
            symbol: feed.instrument().symbol.clone(),
            timeframe,
        };
        let bins = self.config.bins;
        let scratch = self.scratch.entry(key).or_insert_with(|| vec![0.0; bins]);
        Ok(build_profile(window, &self.config, scratch))
    }

    /// Number of (symbol, timeframe) buffers allocated so far.
    pub fn buffer_count(&self) -> usize {
        self.scratch.len()
    }
}

/// Build the profile for `window`, using `scratch` (length `config.bins`) for raw bin totals.
pub fn build_profile(window: &[Bar], config: &ProfileConfig, scratch: &mut [f64]) -> Vec<VolumeZone> {
    let bins = scratch.len();
    if window.is_empty() || bins == 0 {
        return Vec::new();
    }

    let (high, low) = window_extremes(window);
    let range = high - low;
    if range <= 0.0 {
        debug!(high, low, "volume profile skipped: degenerate range");
        return Vec::new();
    }

    scratch.fill(0.0);
    let bin_size = range / bins as f64;
    for bar in window {
        scratch[bin_index(bar.close, low, bin_size, bins)] += bar.volume as f64;
    }

    let smoothed = smooth3(scratch);
    let total: f64 = smoothed.iter().sum();
    if total <= 0.0 {
        debug!("volume profile skipped: no volume in window");
        return Vec::new();
    }

    let midpoint = |bin: usize| low + (bin as f64 + 0.5) * bin_size;

    let poc_bin = first_max_index(&smoothed);
    let poc_price = midpoint(poc_bin);

    let mut ranked: Vec<(usize, f64)> = smoothed.iter().copied().enumerate().collect();
    // Stable: equal volumes keep ascending bin order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let target = total * config.value_area_pct;
    let mut cumulative = 0.0;
    let (mut vah, mut val) = (poc_price, poc_price);
    for (bin, volume) in ranked {
        if cumulative >= target {
            break;
        }
        let center = midpoint(bin);
        vah = vah.max(center);
        val = val.min(center);
        cumulative += volume;
    }

    vec![
        VolumeZone {
            price: poc_price,
            kind: ZoneKind::Poc,
            volume: smoothed[poc_bin],
        },
        VolumeZone {
            price: vah,
            kind: ZoneKind::Vah,
            volume: cumulative,
        },
        VolumeZone {
            price: val,
            kind: ZoneKind::Val,
            volume: cumulative,
        },
    ]
}

/// Bin holding `price`, clamped so the window high lands in the last bin.
fn bin_index(price: f64, low: f64, bin_size: f64, bins: usize) -> usize {
    let raw = ((price - low) / bin_size).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(bins - 1)
    }
}

/// Centred 3-point moving average; edge bins average their two available points.
pub fn smooth3(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let from = i.saturating_sub(1);
            let to = (i + 1).min(n - 1);
            let window = &values[from..=to];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

fn first_max_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Price of the first zone of `kind`, if the profile has one.
pub fn zone_price(zones: &[VolumeZone], kind: ZoneKind) -> Option<f64> {
    zones.iter().find(|z| z.kind == kind).map(|z| z.price)
}
