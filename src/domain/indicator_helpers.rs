//! Shared helper functions for indicator calculations and the
//! [`IndicatorFrame`] that aligns every indicator to the bar index.

use serde::{Deserialize, Serialize};

use crate::domain::indicator::bollinger::{BollingerSeries, calculate_bollinger};
use crate::domain::indicator::ema::calculate_close_ema;
use crate::domain::indicator::levels::{CprLevels, PivotLevels};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::vwap::calculate_vwap;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::{BarSeries, OhlcvBar};

/// Simple rolling mean; defined from index `window - 1`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if window > 0 && i >= window {
            sum -= values[i - window];
        }
        if window == 0 || i + 1 < window {
            out.push(None);
        } else {
            out.push(Some(sum / window as f64));
        }
    }
    out
}

/// Average True Range as a simple rolling mean of true ranges.
/// Bar 0 uses high - low as its true range.
pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: rolling_mean(&tr_values, period),
    }
}

pub fn rolling_mean_volume(bars: &[OhlcvBar], window: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::VolumeMean(window),
        values: rolling_mean(&volumes, window),
    }
}

/// Mean volume over `[max(0, index - window), index)`: however many prior
/// bars exist, up to `window`. Undefined at index 0.
pub fn trailing_mean_volume(bars: &[OhlcvBar], index: usize, window: usize) -> Option<f64> {
    if index == 0 || index > bars.len() || window == 0 {
        return None;
    }
    let start = index.saturating_sub(window);
    let slice = &bars[start..index];
    Some(slice.iter().map(|b| b.volume).sum::<f64>() / slice.len() as f64)
}

/// Lookback parameters for every series in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    pub ema_short: usize,
    pub ema_long: usize,
    pub volume_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            bollinger_period: 20,
            bollinger_stddev: 2.0,
            ema_short: 9,
            ema_long: 21,
            volume_window: 20,
        }
    }
}

/// Every indicator the signal rules and the ledger read, aligned 1:1
/// with the bar series. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub rsi: IndicatorSeries,
    pub vwap: IndicatorSeries,
    pub atr: IndicatorSeries,
    pub bollinger: BollingerSeries,
    pub ema_short: IndicatorSeries,
    pub ema_long: IndicatorSeries,
    pub volume_mean: IndicatorSeries,
    /// Trailing mean volume over prior bars only (see [`trailing_mean_volume`]).
    pub volume_trailing: Vec<Option<f64>>,
    /// CPR at index i is built from bar i-1.
    pub cpr: Vec<Option<CprLevels>>,
    /// Pivots at index i are built from bar i-1.
    pub pivots: Vec<Option<PivotLevels>>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }

    pub fn cpr_at(&self, index: usize) -> Option<CprLevels> {
        self.cpr.get(index).copied().flatten()
    }

    pub fn pivots_at(&self, index: usize) -> Option<PivotLevels> {
        self.pivots.get(index).copied().flatten()
    }

    pub fn volume_trailing_at(&self, index: usize) -> Option<f64> {
        self.volume_trailing.get(index).copied().flatten()
    }
}

pub fn compute_frame(series: &BarSeries, params: &IndicatorParams) -> IndicatorFrame {
    let bars = series.bars();

    let volume_trailing = (0..bars.len())
        .map(|i| trailing_mean_volume(bars, i, params.volume_window))
        .collect();

    let prior_bar = |i: usize| if i == 0 { None } else { bars.get(i - 1) };
    let cpr = (0..bars.len())
        .map(|i| prior_bar(i).map(|p| CprLevels::from_hlc(p.high, p.low, p.close)))
        .collect();
    let pivots = (0..bars.len())
        .map(|i| prior_bar(i).map(|p| PivotLevels::from_hlc(p.high, p.low, p.close)))
        .collect();

    IndicatorFrame {
        rsi: calculate_rsi(bars, params.rsi_period),
        vwap: calculate_vwap(bars),
        atr: calc_atr(bars, params.atr_period),
        bollinger: calculate_bollinger(bars, params.bollinger_period, params.bollinger_stddev),
        ema_short: calculate_close_ema(bars, params.ema_short),
        ema_long: calculate_close_ema(bars, params.ema_long),
        volume_mean: rolling_mean_volume(bars, params.volume_window),
        volume_trailing,
        cpr,
        pivots,
    }
}
