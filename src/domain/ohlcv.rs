//! OHLCV bar representation and the ordered bar series the core reads.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::PivotraderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Bar spacing requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Hour1,
    Day1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Interval::Minute1),
            "5m" => Ok(Interval::Minute5),
            "15m" => Ok(Interval::Minute15),
            "1h" | "60m" => Ok(Interval::Hour1),
            "1d" | "daily" => Ok(Interval::Day1),
            other => Err(format!("unknown interval '{other}' (expected 1m, 5m, 15m, 1h or 1d)")),
        }
    }
}

/// Bars in strictly increasing timestamp order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarSeries {
    bars: Vec<OhlcvBar>,
}

impl BarSeries {
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, PivotraderError> {
        if let Some(index) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(PivotraderError::UnorderedBars { index: index + 1 });
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OhlcvBar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&OhlcvBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OhlcvBar> {
        self.bars.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a OhlcvBar;
    type IntoIter = std::slice::Iter<'a, OhlcvBar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar(day: u32) -> OhlcvBar {
        OhlcvBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar(15);
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar(15);
        // |90-130| = 40 beats high-low = 20
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn series_accepts_increasing_timestamps() {
        let series = BarSeries::new(vec![sample_bar(1), sample_bar(2), sample_bar(3)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![105.0, 105.0, 105.0]);
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let err = BarSeries::new(vec![sample_bar(1), sample_bar(2), sample_bar(2)]).unwrap_err();
        assert!(matches!(err, PivotraderError::UnorderedBars { index: 2 }));
    }

    #[test]
    fn series_rejects_out_of_order_timestamps() {
        let err = BarSeries::new(vec![sample_bar(3), sample_bar(1)]).unwrap_err();
        assert!(matches!(err, PivotraderError::UnorderedBars { index: 1 }));
    }

    #[test]
    fn empty_series_is_allowed() {
        let series = BarSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.first().is_none());
    }

    #[test]
    fn interval_parses_and_displays() {
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::Minute15);
        assert_eq!("1D".parse::<Interval>().unwrap(), Interval::Day1);
        assert_eq!(Interval::Hour1.to_string(), "1h");
        assert!("2w".parse::<Interval>().is_err());
    }
}
