//! Discrete per-bar trading signals.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Signal {
    #[default]
    Hold = 0,
    Buy = 1,
    Sell = -1,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "hold"),
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
        }
    }
}

/// One signal per bar, aligned with the bar series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSeries {
    signals: Vec<Signal>,
}

impl SignalSeries {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }

    pub fn hold(len: usize) -> Self {
        Self {
            signals: vec![Signal::Hold; len],
        }
    }

    /// Hold for indices past the end.
    pub fn get(&self, index: usize) -> Signal {
        self.signals.get(index).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.signals
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.signals.iter().filter(|s| **s == signal).count()
    }
}

impl FromIterator<Signal> for SignalSeries {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self {
            signals: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants() {
        assert_eq!(Signal::Hold.as_i8(), 0);
        assert_eq!(Signal::Buy.as_i8(), 1);
        assert_eq!(Signal::Sell.as_i8(), -1);
    }

    #[test]
    fn out_of_range_is_hold() {
        let series = SignalSeries::new(vec![Signal::Buy]);
        assert_eq!(series.get(0), Signal::Buy);
        assert_eq!(series.get(5), Signal::Hold);
    }

    #[test]
    fn count_and_collect() {
        let series: SignalSeries = [Signal::Buy, Signal::Hold, Signal::Buy, Signal::Sell]
            .into_iter()
            .collect();
        assert_eq!(series.len(), 4);
        assert_eq!(series.count(Signal::Buy), 2);
        assert_eq!(series.count(Signal::Sell), 1);
        assert_eq!(SignalSeries::hold(3).count(Signal::Hold), 3);
    }
}
