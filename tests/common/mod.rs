#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use pivotrader::domain::backtest::BacktestConfig;
use pivotrader::domain::error::PivotraderError;
use pivotrader::domain::execution::{ExitPolicy, SizingParams, StopTakeParams};
use pivotrader::domain::indicator_helpers::IndicatorParams;
pub use pivotrader::domain::ohlcv::{BarSeries, Interval, OhlcvBar};
use pivotrader::domain::strategy::{CprPivotRule, SignalRule};
use pivotrader::ports::data_port::DataPort;
use pivotrader::ports::event_port::{BacktestEvent, EventSink};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<BarSeries, PivotraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PivotraderError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars: Vec<OhlcvBar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start_date && b.date() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(PivotraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        BarSeries::new(bars)
    }

    fn list_symbols(&self, _interval: Interval) -> Result<Vec<String>, PivotraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _interval: Interval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PivotraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date()).min().unwrap();
                let max = bars.iter().map(|b| b.date()).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Keeps every event it is given.
#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<BacktestEvent>>,
}

impl RecordingSink {
    pub fn count<F: Fn(&BacktestEvent) -> bool>(&self, pred: F) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &BacktestEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day_ts(day_offset: i64) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(day_offset)
}

pub fn make_bar(day_offset: i64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: day_ts(day_offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume,
    }
}

pub fn generate_bars(count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| make_bar(i as i64, start_price + step * i as f64, 1000.0))
        .collect()
}

/// Rising closes, one volume spike at bar 4 that clears the CPR/pivot
/// entry, then a close above the 4% take-profit at bar 5.
pub fn cpr_breakout_bars() -> Vec<OhlcvBar> {
    vec![
        make_bar(0, 100.0, 1000.0),
        make_bar(1, 101.0, 1000.0),
        make_bar(2, 102.0, 1000.0),
        make_bar(3, 103.0, 1000.0),
        make_bar(4, 105.5, 5000.0),
        make_bar(5, 110.0, 1000.0),
        make_bar(6, 110.0, 1000.0),
    ]
}

pub fn short_indicator_params() -> IndicatorParams {
    IndicatorParams {
        rsi_period: 2,
        atr_period: 2,
        bollinger_period: 3,
        bollinger_stddev: 2.0,
        ema_short: 2,
        ema_long: 3,
        volume_window: 3,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        symbol: "AAPL".into(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        interval: Interval::Day1,
        initial_capital: 100_000.0,
        indicators: short_indicator_params(),
        signal: SignalRule::CprPivot(CprPivotRule::default()),
        exit: ExitPolicy::StopTakeProfit(StopTakeParams::default()),
        sizing: SizingParams::default(),
    }
}

pub const CSV_HEADER: &str = "timestamp,open,high,low,close,volume\n";

pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from(CSV_HEADER);
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
