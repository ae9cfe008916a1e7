//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first value (no SMA seed, no bias
//! adjustment): EMA[0] = X[0], EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! Every index is defined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(values: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::undefined(IndicatorType::Ema(period), values.len());
    }

    let k = smoothing_factor(period);
    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;

    for &x in values {
        let next = match ema {
            None => x,
            Some(prev) => x * k + prev * (1.0 - k),
        };
        ema = Some(next);
        out.push(Some(next));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: out,
    }
}

/// EMA of closing prices.
pub fn calculate_close_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    calculate_ema(&closes, period)
}

pub fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}
