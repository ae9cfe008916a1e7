//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) of close over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::{BollingerBand, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<BollingerBand>>,
}

impl BollingerSeries {
    pub fn get(&self, index: usize) -> Option<BollingerBand> {
        self.values.get(index).copied().flatten()
    }

    pub fn lower(&self, index: usize) -> Option<f64> {
        self.get(index).map(|b| b.lower)
    }

    pub fn upper(&self, index: usize) -> Option<f64> {
        self.get(index).map(|b| b.upper)
    }
}

pub fn calculate_bollinger(bars: &[OhlcvBar], period: usize, mult: f64) -> BollingerSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100: (mult * 100.0).round() as u32,
    };
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        if period == 0 || i + 1 < period {
            values.push(None);
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|b| {
                let diff = b.close - middle;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        values.push(Some(BollingerBand {
            upper: middle + mult * stddev,
            middle,
            lower: middle - mult * stddev,
        }));
    }

    BollingerSeries {
        indicator_type,
        values,
    }
}
