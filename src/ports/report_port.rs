//! Report generation port trait.

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::PivotraderError;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::BarSeries;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;

/// Read-only view of a finished run for report writers.
#[derive(Debug, Clone, Copy)]
pub struct ReportSnapshot<'a> {
    pub config: &'a BacktestConfig,
    pub bars: &'a BarSeries,
    pub ema_short: &'a IndicatorSeries,
    pub ema_long: &'a IndicatorSeries,
    pub trades: &'a [Trade],
    pub equity_curve: &'a [EquityPoint],
    pub metrics: &'a Metrics,
}

impl<'a> ReportSnapshot<'a> {
    pub fn new(
        config: &'a BacktestConfig,
        bars: &'a BarSeries,
        result: &'a BacktestResult,
    ) -> Self {
        ReportSnapshot {
            config,
            bars,
            ema_short: &result.frame.ema_short,
            ema_long: &result.frame.ema_long,
            trades: &result.trades,
            equity_curve: &result.equity_curve,
            metrics: &result.metrics,
        }
    }
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, snapshot: &ReportSnapshot<'_>, output_path: &str)
        -> Result<(), PivotraderError>;
}
