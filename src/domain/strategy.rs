//! Signal rule sets.
//!
//! Two rule sets live side by side behind [`SignalGenerator`]:
//! - [`ThresholdRule`]: RSI / VWAP / volume-surge entries, RSI / Bollinger exits
//! - [`CprPivotRule`]: CPR + pivot + EMA crossover entries, no sell signal
//!
//! Any comparison against an undefined indicator value is false, so
//! warm-up bars always produce [`Signal::Hold`].

use serde::{Deserialize, Serialize};

use crate::domain::indicator_helpers::IndicatorFrame;
use crate::domain::ohlcv::BarSeries;
use crate::domain::signal::{Signal, SignalSeries};

pub trait SignalGenerator {
    fn name(&self) -> &'static str;

    fn generate(&self, bars: &BarSeries, frame: &IndicatorFrame) -> SignalSeries;
}

/// `a > b` when both sides are defined.
fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// `a < b` when both sides are defined.
fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Volume must exceed this multiple of the rolling mean volume.
    pub volume_surge: f64,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            volume_surge: 1.2,
        }
    }
}

impl ThresholdRule {
    fn signal_at(&self, bars: &BarSeries, frame: &IndicatorFrame, i: usize) -> Signal {
        let Some(bar) = bars.get(i) else {
            return Signal::Hold;
        };
        let close = Some(bar.close);
        let rsi = frame.rsi.get(i);

        let buy = lt(rsi, Some(self.rsi_oversold))
            && gt(close, frame.vwap.get(i))
            && gt(
                Some(bar.volume),
                frame.volume_mean.get(i).map(|m| m * self.volume_surge),
            );
        let sell = gt(rsi, Some(self.rsi_overbought)) || lt(close, frame.bollinger.lower(i));

        if sell {
            Signal::Sell
        } else if buy {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}

impl SignalGenerator for ThresholdRule {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn generate(&self, bars: &BarSeries, frame: &IndicatorFrame) -> SignalSeries {
        (0..bars.len()).map(|i| self.signal_at(bars, frame, i)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CprPivotRule {
    /// Volume must exceed this multiple of the trailing mean volume.
    pub volume_threshold: f64,
    /// Relative distance under which a close counts as "at" a resistance.
    pub pivot_threshold: f64,
}

impl Default for CprPivotRule {
    fn default() -> Self {
        Self {
            volume_threshold: 1.5,
            pivot_threshold: 0.001,
        }
    }
}

impl CprPivotRule {
    fn signal_at(&self, bars: &BarSeries, frame: &IndicatorFrame, i: usize) -> Signal {
        if i == 0 {
            return Signal::Hold;
        }
        let (Some(bar), Some(cpr), Some(pivots)) =
            (bars.get(i), frame.cpr_at(i), frame.pivots_at(i))
        else {
            return Signal::Hold;
        };
        let close = bar.close;

        let above_cpr = close > cpr.tc;
        let trend_up = gt(frame.ema_short.get(i), frame.ema_long.get(i));
        let volume_ok = gt(
            Some(bar.volume),
            frame.volume_trailing_at(i).map(|m| m * self.volume_threshold),
        );
        let above_pivot = close > pivots.pivot;
        let clear_of_resistance = !pivots.near_resistance(close, self.pivot_threshold);
        let above_support = close > pivots.s1;

        if above_cpr && trend_up && volume_ok && above_pivot && clear_of_resistance && above_support
        {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}

impl SignalGenerator for CprPivotRule {
    fn name(&self) -> &'static str {
        "cpr_pivot"
    }

    fn generate(&self, bars: &BarSeries, frame: &IndicatorFrame) -> SignalSeries {
        (0..bars.len()).map(|i| self.signal_at(bars, frame, i)).collect()
    }
}

/// The configured rule set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalRule {
    Threshold(ThresholdRule),
    CprPivot(CprPivotRule),
}

impl Default for SignalRule {
    fn default() -> Self {
        SignalRule::CprPivot(CprPivotRule::default())
    }
}

impl SignalGenerator for SignalRule {
    fn name(&self) -> &'static str {
        match self {
            SignalRule::Threshold(rule) => rule.name(),
            SignalRule::CprPivot(rule) => rule.name(),
        }
    }

    fn generate(&self, bars: &BarSeries, frame: &IndicatorFrame) -> SignalSeries {
        match self {
            SignalRule::Threshold(rule) => rule.generate(bars, frame),
            SignalRule::CprPivot(rule) => rule.generate(bars, frame),
        }
    }
}
