//! Run persistence port.

use serde::{Deserialize, Serialize};

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::PivotraderError;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub config: BacktestConfig,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

impl RunRecord {
    pub fn from_result(config: &BacktestConfig, result: &BacktestResult) -> Self {
        RunRecord {
            run_id: config.run_id(),
            config: config.clone(),
            trades: result.trades.clone(),
            equity_curve: result.equity_curve.clone(),
            metrics: result.metrics.clone(),
        }
    }
}

pub trait PersistencePort {
    /// Stores `record`, replacing any earlier record with the same run id.
    fn save_run(&self, record: &RunRecord) -> Result<(), PivotraderError>;
}
