//! Data access port trait.

use crate::domain::error::PivotraderError;
use crate::domain::ohlcv::{BarSeries, Interval};
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` with dates in `[start_date, end_date]`, ordered by
    /// timestamp. An empty result is `NoData`, never an empty series.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<BarSeries, PivotraderError>;

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, PivotraderError>;

    /// First date, last date and bar count, or `None` when the symbol has no data.
    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PivotraderError>;
}
