//! Wilder smoothing and true range, shared by the trend-strength indicator.

use crate::domain::Bar;

/// True range series.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    let Some(first) = bars.first() else {
        return tr;
    };
    tr[0] = first.high - first.low;

    for i in 1..bars.len() {
        let (h, l, pc) = (bars[i].high, bars[i].low, bars[i - 1].close);
        // f64::max ignores NaN operands, so void inputs are checked explicitly.
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period).
///
/// Seeded with the mean of the first run of `period` consecutive non-NaN values.
/// A NaN after the seed voids the remainder of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let Some(seed_start) = first_valid_run(values, period) else {
        return result;
    };
    let seed_end = seed_start + period;

    let seed = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Start of the first window of `period` consecutive non-NaN values.
fn first_valid_run(values: &[f64], period: usize) -> Option<usize> {
    let mut run = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
            continue;
        }
        run += 1;
        if run == period {
            return Some(i + 1 - period);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, 15, 8) = 15
        ]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_seed_and_step() {
        let out = wilder_smooth(&[f64::NAN, 8.0, 9.0, 6.0, 6.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan() && out[2].is_nan());
        assert_approx(out[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(out[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_seed_skips_broken_runs() {
        let out = wilder_smooth(&[1.0, f64::NAN, 2.0, 4.0], 2);
        assert!(out[1].is_nan() && out[2].is_nan());
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_too_short() {
        assert!(wilder_smooth(&[1.0], 2).iter().all(|v| v.is_nan()));
        assert!(wilder_smooth(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }
}
