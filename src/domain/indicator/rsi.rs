//! RSI (Relative Strength Index) indicator.
//!
//! Average gain/loss are simple rolling means of the last `period` close
//! deltas (no Wilder smoothing):
//! - gain[i] = max(C[i] - C[i-1], 0), loss[i] = max(C[i-1] - C[i], 0)
//! - RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! - avg_loss == 0: RSI = 100
//!
//! Bar 0 has no previous close and counts as a zero delta, so the first
//! `period - 1` bars are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < period {
        return IndicatorSeries::undefined(IndicatorType::Rsi(period), bars.len());
    }

    let mut gains = vec![0.0; bars.len()];
    let mut losses = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut values = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if i + 1 < period {
            values.push(None);
            continue;
        }
        let window = i + 1 - period..=i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
        values.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
    rsi.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert!(series.is_empty());
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=16).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        assert_eq!(series.len(), 16);
        for i in 0..13 {
            assert!(series.get(i).is_none(), "bar {} should be undefined", i);
        }
        assert!(series.get(13).is_some());
        assert!(series.get(15).is_some());
    }

    #[test]
    fn rsi_first_value_counts_bar_zero_as_flat() {
        // deltas: 0 (no prior close), +2, -1, +2 ; period 3
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0, 13.0]), 3);
        assert_eq!(series.get(0), None);
        assert_eq!(series.get(1), None);
        // bar 2: gains {0, 2, 0} -> 2/3, losses {0, 0, 1} -> 1/3 ; RS = 2
        let expected = 100.0 - 100.0 / 3.0;
        assert!((series.get(2).unwrap() - expected).abs() < 1e-9);
        // bar 3: gains {2, 0, 2} -> 4/3, losses {0, 1, 0} -> 1/3 ; RS = 4
        assert!((series.get(3).unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_series_exactly_period_long() {
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0]), 3);
        assert_eq!(series.defined_count(), 1);
        assert!(series.get(2).is_some());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        assert_eq!(series.get(14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        let rsi = series.get(14).unwrap();
        assert!(rsi.abs() < 1e-12);
    }

    #[test]
    fn rsi_flat_prices_clamp_to_100() {
        let series = calculate_rsi(&make_bars(&[50.0; 6]), 3);
        assert_eq!(series.get(3), Some(100.0));
        assert_eq!(series.get(5), Some(100.0));
    }

    #[test]
    fn rsi_simple_rolling_mean_not_wilder() {
        // deltas: +2, -1, +1, -2 ; period 2
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0, 12.0, 10.0]), 2);
        // bar 2: gains {2, 0} -> 1.0, losses {0, 1} -> 0.5 ; RSI = 100 - 100/3
        let expected = 100.0 - 100.0 / 3.0;
        assert!((series.get(2).unwrap() - expected).abs() < 1e-9);
        // bar 4: gains {1, 0} -> 0.5, losses {0, 2} -> 1.0 ; RSI = 100 - 100/1.5
        let expected = 100.0 - 100.0 / 1.5;
        assert!((series.get(4).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        for rsi in series.values.iter().flatten() {
            assert!((0.0..=100.0).contains(rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_bars(&[100.0, 101.0]), 0);
        assert_eq!(series.len(), 2);
        assert_eq!(series.defined_count(), 0);
    }

    #[test]
    fn rsi_indicator_type() {
        let series = calculate_rsi(&make_bars(&[100.0]), 14);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(14));
    }
}
