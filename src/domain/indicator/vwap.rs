//! Volume Weighted Average Price.
//!
//! Cumulative from the start of the series:
//! VWAP[i] = Σ(close × volume) / Σ(volume) over bars 0..=i.
//! Undefined while cumulative volume is still zero.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_vwap(bars: &[OhlcvBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for bar in bars {
        cum_pv += bar.close * bar.volume;
        cum_vol += bar.volume;
        if cum_vol > 0.0 {
            values.push(Some(cum_pv / cum_vol));
        } else {
            values.push(None);
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Vwap,
        values,
    }
}
