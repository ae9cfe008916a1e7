//! Performance metrics and statistics.
//!
//! Returns-based figures use the 252-trading-day convention regardless of
//! bar interval. Trade statistics come in two flavours:
//! - [`TradeStats`]: positional figures measured against the first buy
//! - [`RoundTripStats`]: buys paired with their exits via [`round_trips`]

use serde::{Deserialize, Serialize};

use super::portfolio::EquityPoint;
use super::position::{Trade, TradeKind, round_trips};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub win_rate: f64,
    pub avg_trade_duration_days: i64,
    pub profit_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoundTripStats {
    pub count: usize,
    pub closed: usize,
    pub winners: usize,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Projections {
    pub one_month: f64,
    pub twelve_months: f64,
    pub ten_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub daily_volatility: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub avg_drawdown: f64,
    pub drawdown_duration: usize,
    pub trade_stats: Option<TradeStats>,
    pub round_trips: RoundTripStats,
    pub projections: Projections,
}

impl Metrics {
    pub fn compute(initial_capital: f64, equity_curve: &[EquityPoint], trades: &[Trade]) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let initial_value = values.first().copied().unwrap_or(initial_capital);
        let final_value = values.last().copied().unwrap_or(initial_capital);

        let ratio = if initial_value > 0.0 {
            final_value / initial_value
        } else {
            1.0
        };
        let total_return = ratio - 1.0;
        let annualized_return = if values.is_empty() {
            0.0
        } else {
            ratio.powf(TRADING_DAYS_PER_YEAR / values.len() as f64) - 1.0
        };

        let returns = pct_returns(&values);
        let daily_volatility = sample_std(&returns).unwrap_or(0.0);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns);
        let (max_drawdown, avg_drawdown, drawdown_duration) = compute_drawdown(&values);

        Metrics {
            initial_value,
            final_value,
            total_return,
            annualized_return,
            daily_volatility,
            annualized_volatility: daily_volatility * TRADING_DAYS_PER_YEAR.sqrt(),
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            avg_drawdown,
            drawdown_duration,
            trade_stats: compute_trade_stats(trades),
            round_trips: compute_round_trip_stats(trades),
            projections: project(final_value, annualized_return),
        }
    }
}

fn pct_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            let prev = w[0];
            let curr = w[1];
            if prev != 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); `None` below two observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }
    let mean_return = mean(returns);

    let sharpe = match sample_std(returns) {
        Some(std) if std > 0.0 => mean_return / std * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    };

    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino = match sample_std(&negative) {
        Some(std) if std > 0.0 => mean_return / std * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    };

    (sharpe, sortino)
}

/// (max drawdown, mean drawdown over bars in drawdown, bars in drawdown).
/// Drawdowns are fractions ≤ 0 relative to the running peak.
fn compute_drawdown(values: &[f64]) -> (f64, f64, usize) {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    let mut dd_sum = 0.0_f64;
    let mut dd_bars = 0usize;

    for &value in values {
        peak = peak.max(value);
        if peak <= 0.0 {
            continue;
        }
        let dd = value / peak - 1.0;
        if dd < 0.0 {
            max_dd = max_dd.min(dd);
            dd_sum += dd;
            dd_bars += 1;
        }
    }

    let avg_dd = if dd_bars > 0 {
        dd_sum / dd_bars as f64
    } else {
        0.0
    };
    (max_dd, avg_dd, dd_bars)
}

/// Positional trade statistics against the first buy. `None` without at
/// least one buy and one full sell.
pub fn compute_trade_stats(trades: &[Trade]) -> Option<TradeStats> {
    let buys: Vec<&Trade> = trades.iter().filter(|t| t.kind == TradeKind::Buy).collect();
    let sells: Vec<&Trade> = trades.iter().filter(|t| t.kind == TradeKind::Sell).collect();
    let first_buy = buys.first()?;
    if sells.is_empty() {
        return None;
    }

    let winners = sells.iter().filter(|t| t.price > first_buy.price).count();
    let win_rate = winners as f64 / sells.len() as f64;

    let total_secs: i64 = sells
        .iter()
        .map(|t| (t.timestamp - first_buy.timestamp).num_seconds())
        .sum();
    let mean_secs = total_secs as f64 / sells.len() as f64;
    let avg_trade_duration_days = (mean_secs / 86_400.0).floor() as i64;

    let buy_sum: f64 = buys.iter().map(|t| t.price).sum();
    let sell_sum: f64 = sells.iter().map(|t| t.price).sum();
    let profit_factor = if buy_sum != 0.0 {
        (sell_sum / buy_sum).abs()
    } else {
        0.0
    };

    Some(TradeStats {
        total_trades: trades.len(),
        win_rate,
        avg_trade_duration_days,
        profit_factor,
    })
}

pub fn compute_round_trip_stats(trades: &[Trade]) -> RoundTripStats {
    let trips = round_trips(trades);
    let closed: Vec<_> = trips.iter().filter(|t| t.is_closed()).collect();
    RoundTripStats {
        count: trips.len(),
        closed: closed.len(),
        winners: closed.iter().filter(|t| t.pnl() > 0.0).count(),
        realized_pnl: trips.iter().map(|t| t.pnl()).sum(),
    }
}

pub fn project(current_value: f64, annualized_return: f64) -> Projections {
    let growth = 1.0 + annualized_return;
    Projections {
        one_month: current_value * growth.powf(1.0 / 12.0),
        twelve_months: current_value * growth,
        ten_years: current_value * growth.powi(10),
    }
}
