//! CSV file data adapter.
//!
//! One file per symbol and interval, `{SYMBOL}_{interval}.csv`, with header
//! `timestamp,open,high,low,close,volume`. Timestamps are either
//! `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM:SS`.

use crate::domain::error::PivotraderError;
use crate::domain::ohlcv::{BarSeries, Interval, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, PivotraderError> {
    let value = value.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| PivotraderError::DataSource {
            reason: format!("invalid timestamp '{}'", value),
        })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }

    /// Every row of the file, sorted by timestamp.
    fn read_all(&self, symbol: &str, interval: Interval) -> Result<Vec<OhlcvBar>, PivotraderError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| PivotraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| PivotraderError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            bars.push(OhlcvBar {
                timestamp: parse_timestamp(&row.timestamp)?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<BarSeries, PivotraderError> {
        let bars: Vec<OhlcvBar> = self
            .read_all(symbol, interval)?
            .into_iter()
            .filter(|b| b.date() >= start_date && b.date() <= end_date)
            .collect();

        if bars.is_empty() {
            return Err(PivotraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        log::debug!("loaded {} bars for {} ({})", bars.len(), symbol, interval);
        BarSeries::new(bars)
    }

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, PivotraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| PivotraderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| PivotraderError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PivotraderError> {
        if !self.csv_path(symbol, interval).exists() {
            return Ok(None);
        }
        let bars = self.read_all(symbol, interval)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date(), last.date(), bars.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("AAPL_1d.csv"), csv_content).unwrap();
        fs::write(
            path.join("MSFT_1d.csv"),
            "timestamp,open,high,low,close,volume\n",
        )
        .unwrap();
        fs::write(
            path.join("AAPL_15m.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-15 09:30:00,1,2,0.5,1.5,100\n\
             2024-01-15 09:45:00,1.5,2,1,1.8,120\n",
        )
        .unwrap();

        (dir, path)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn fetch_bars_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", day(15), day(17), Interval::Day1).unwrap();

        assert_eq!(bars.len(), 3);
        let first = bars.first().unwrap();
        assert_eq!(first.date(), day(15));
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 110.0);
        assert_eq!(first.low, 90.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(first.volume, 50000.0);
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", day(16), day(16), Interval::Day1).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars.first().unwrap().date(), day(16));
    }

    #[test]
    fn fetch_bars_reads_intraday_timestamps() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", day(15), day(15), Interval::Minute15).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars.last().unwrap().timestamp,
            day(15).and_hms_opt(9, 45, 0).unwrap()
        );
    }

    #[test]
    fn empty_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("MSFT", day(1), day(31), Interval::Day1).unwrap_err();
        assert!(matches!(err, PivotraderError::NoData { .. }));
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("XYZ", day(1), day(31), Interval::Day1).unwrap_err();
        assert!(matches!(err, PivotraderError::DataSource { .. }));
    }

    #[test]
    fn list_symbols_by_interval() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols(Interval::Day1).unwrap(), vec!["AAPL", "MSFT"]);
        assert_eq!(adapter.list_symbols(Interval::Minute15).unwrap(), vec!["AAPL"]);
    }

    #[test]
    fn data_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.get_data_range("AAPL", Interval::Day1).unwrap(),
            Some((day(15), day(17), 3))
        );
        assert_eq!(adapter.get_data_range("MSFT", Interval::Day1).unwrap(), None);
        assert_eq!(adapter.get_data_range("XYZ", Interval::Day1).unwrap(), None);
    }

    #[test]
    fn parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap(),
            day(15).and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-01-15 13:05:00").unwrap(),
            day(15).and_hms_opt(13, 5, 0).unwrap()
        );
        assert!(parse_timestamp("15/01/2024").is_err());
    }
}
