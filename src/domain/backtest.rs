//! Backtest engine and event loop.
//!
//! [`BacktestConfig`] is the full, serialisable description of a run.
//! [`run_backtest`] threads one immutable stage into the next:
//! bars → indicator frame → signals → ledger pass → metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::PivotraderError;
use super::execution::{ExitPolicy, SizingParams, step};
use super::indicator_helpers::{IndicatorFrame, IndicatorParams, compute_frame};
use super::metrics::Metrics;
use super::ohlcv::{BarSeries, Interval};
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{Position, Trade};
use super::signal::SignalSeries;
use super::strategy::{SignalGenerator, SignalRule};
use crate::ports::event_port::{BacktestEvent, EventSink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval: Interval,
    pub initial_capital: f64,
    pub indicators: IndicatorParams,
    pub signal: SignalRule,
    pub exit: ExitPolicy,
    pub sizing: SizingParams,
}

impl BacktestConfig {
    /// Stable identifier for a run: the same config always maps to the
    /// same id, so re-running overwrites rather than duplicates. The
    /// trailing digest covers every parameter, so runs that differ only
    /// in thresholds or targets get their own id.
    pub fn run_id(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}",
            self.symbol,
            self.interval,
            self.start_date.format("%Y%m%d"),
            self.end_date.format("%Y%m%d"),
            self.signal.name(),
            self.exit.name(),
            self.digest()
        )
    }

    /// First 8 hex digits of FNV-1a 64 over the JSON form of the config.
    fn digest(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        let hash = json.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        format!("{:016x}", hash)[..8].to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub frame: IndicatorFrame,
    pub signals: SignalSeries,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_cash: f64,
    pub final_position: Position,
    pub metrics: Metrics,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.final_cash)
    }
}

pub fn run_backtest(
    bars: &BarSeries,
    config: &BacktestConfig,
    sink: &dyn EventSink,
) -> Result<BacktestResult, PivotraderError> {
    if bars.is_empty() {
        return Err(PivotraderError::NoData {
            symbol: config.symbol.clone(),
            interval: config.interval.to_string(),
        });
    }

    sink.record(&BacktestEvent::RunStarted {
        signal: config.signal.name(),
        exit: config.exit.name(),
        bars: bars.len(),
        initial_capital: config.initial_capital,
    });

    let frame = compute_frame(bars, &config.indicators);
    let signals = config.signal.generate(bars, &frame);

    let mut portfolio = Portfolio::new(config.initial_capital);
    for (i, bar) in bars.iter().enumerate() {
        step(
            &mut portfolio,
            bar,
            signals.get(i),
            frame.atr.get(i),
            &config.sizing,
            &config.exit,
            sink,
        );
    }

    let metrics = Metrics::compute(
        config.initial_capital,
        &portfolio.equity_curve,
        &portfolio.trades,
    );

    let result = BacktestResult {
        frame,
        signals,
        trades: portfolio.trades,
        equity_curve: portfolio.equity_curve,
        final_cash: portfolio.cash,
        final_position: portfolio.position,
        metrics,
    };

    sink.record(&BacktestEvent::RunCompleted {
        trades: result.trades.len(),
        final_equity: result.final_equity(),
    });

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::StagedExitParams;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::strategy::CprPivotRule;
    use crate::ports::event_port::NullEventSink;

    fn sample_config() -> BacktestConfig {
        BacktestConfig {
            symbol: "AAPL".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            interval: Interval::Day1,
            initial_capital: 100_000.0,
            indicators: IndicatorParams::default(),
            signal: SignalRule::CprPivot(CprPivotRule::default()),
            exit: ExitPolicy::StagedPartial(StagedExitParams::default()),
            sizing: SizingParams::default(),
        }
    }

    fn flat_bars(n: usize) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = (0..n)
            .map(|i| OhlcvBar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1000.0,
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    #[test]
    fn empty_series_is_no_data() {
        let err =
            run_backtest(&BarSeries::default(), &sample_config(), &NullEventSink).unwrap_err();
        assert!(matches!(err, PivotraderError::NoData { ref symbol, .. } if symbol == "AAPL"));
    }

    #[test]
    fn equity_curve_matches_bars() {
        let bars = flat_bars(30);
        let result = run_backtest(&bars, &sample_config(), &NullEventSink).unwrap();

        assert_eq!(result.equity_curve.len(), 30);
        for (point, bar) in result.equity_curve.iter().zip(bars.iter()) {
            assert_eq!(point.timestamp, bar.timestamp);
        }
        assert!((result.equity_curve[0].equity - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flat_market_never_trades() {
        let result = run_backtest(&flat_bars(30), &sample_config(), &NullEventSink).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.final_position.is_flat());
        assert_eq!(result.metrics.sharpe_ratio, 0.0);
        assert_eq!(result.final_equity(), 100_000.0);
    }

    #[test]
    fn run_id_is_stable() {
        let config = sample_config();
        let id = config.run_id();
        assert!(id.starts_with("AAPL_1d_20240101_20241231_cpr_pivot_staged_"));
        let digest = id.rsplit('_').next().unwrap();
        assert_eq!(digest.len(), 8);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, config.clone().run_id());
    }

    #[test]
    fn run_id_tracks_every_parameter() {
        let base = sample_config();

        let mut targets = base.clone();
        targets.exit = ExitPolicy::StagedPartial(StagedExitParams {
            first_target: 0.03,
            ..StagedExitParams::default()
        });
        let mut capital = base.clone();
        capital.initial_capital = 50_000.0;
        let mut periods = base.clone();
        periods.indicators.rsi_period = 7;

        for other in [targets, capital, periods] {
            assert_ne!(base.run_id(), other.run_id());
        }
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = sample_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
