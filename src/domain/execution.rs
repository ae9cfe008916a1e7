//! Position ledger state machine.
//!
//! Implements risk-based entry sizing, the two exit policies and the
//! per-bar step that ties them together. Everything here is infallible:
//! degenerate inputs skip the entry instead of erroring.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ohlcv::OhlcvBar;
use super::portfolio::Portfolio;
use super::position::{ExitStage, TradeKind};
use super::signal::Signal;
use crate::ports::event_port::{BacktestEvent, EventSink, SkipReason};

/// Entry sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingParams {
    /// Percent of cash put at risk per entry.
    pub position_size_percent: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        SizingParams {
            position_size_percent: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagedExitParams {
    /// Gain over entry that triggers the first partial exit.
    pub first_target: f64,
    /// Gain over entry that triggers the exit of the remainder.
    pub second_target: f64,
    /// Share of the remaining size sold at the first target.
    pub partial_fraction: f64,
}

impl Default for StagedExitParams {
    fn default() -> Self {
        StagedExitParams {
            first_target: 0.02,
            second_target: 0.025,
            partial_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopTakeParams {
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Risk-size the entry instead of trading a single unit.
    pub size_weighted: bool,
}

impl Default for StopTakeParams {
    fn default() -> Self {
        StopTakeParams {
            stop_loss: 0.02,
            take_profit: 0.04,
            size_weighted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitPolicy {
    StagedPartial(StagedExitParams),
    StopTakeProfit(StopTakeParams),
}

impl ExitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ExitPolicy::StagedPartial(_) => "staged",
            ExitPolicy::StopTakeProfit(_) => "stop_take",
        }
    }
}

impl Default for ExitPolicy {
    fn default() -> Self {
        ExitPolicy::StagedPartial(StagedExitParams::default())
    }
}

/// Risk-based size: min(cash × pct / 100 / ATR, floor(cash / price)).
pub fn calculate_position_size(
    cash: f64,
    price: f64,
    atr: Option<f64>,
    params: &SizingParams,
) -> Result<f64, SkipReason> {
    let atr = match atr {
        Some(atr) if atr > 0.0 => atr,
        _ => return Err(SkipReason::AtrUndefined),
    };
    if price <= 0.0 {
        return Err(SkipReason::NonPositivePrice);
    }

    let risk_amount = cash * params.position_size_percent / 100.0;
    let size = (risk_amount / atr).min((cash / price).floor());
    if size > 0.0 {
        Ok(size)
    } else {
        Err(SkipReason::ZeroSize)
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryResult {
    Entered { size: f64, price: f64 },
    Skipped(SkipReason),
}

/// Open a position at the bar's close.
///
/// Stop/take levels are only set under [`ExitPolicy::StopTakeProfit`].
/// Without `size_weighted` that policy trades one unit and needs the cash
/// to cover it.
pub fn try_enter(
    portfolio: &mut Portfolio,
    bar: &OhlcvBar,
    atr: Option<f64>,
    sizing: &SizingParams,
    policy: &ExitPolicy,
    sink: &dyn EventSink,
) -> EntryResult {
    let price = bar.close;
    let sized = match policy {
        ExitPolicy::StopTakeProfit(p) if !p.size_weighted => {
            if price <= 0.0 {
                Err(SkipReason::NonPositivePrice)
            } else if portfolio.cash < price {
                Err(SkipReason::InsufficientCash)
            } else {
                Ok(1.0)
            }
        }
        _ => calculate_position_size(portfolio.cash, price, atr, sizing),
    };

    let size = match sized {
        Ok(size) => size,
        Err(reason) => {
            sink.record(&BacktestEvent::EntrySkipped {
                timestamp: bar.timestamp,
                reason,
            });
            return EntryResult::Skipped(reason);
        }
    };

    let (stop_loss, take_profit) = match policy {
        ExitPolicy::StopTakeProfit(p) => (
            Some(price * (1.0 - p.stop_loss)),
            Some(price * (1.0 + p.take_profit)),
        ),
        ExitPolicy::StagedPartial(_) => (None, None),
    };

    portfolio.buy(price, bar.timestamp, size, stop_loss, take_profit);
    sink.record(&BacktestEvent::PositionOpened {
        timestamp: bar.timestamp,
        price,
        size,
    });

    EntryResult::Entered { size, price }
}

fn emit_exit(
    portfolio: &mut Portfolio,
    kind: TradeKind,
    price: f64,
    timestamp: NaiveDateTime,
    size: f64,
    sink: &dyn EventSink,
) -> f64 {
    let sold = portfolio.sell(kind, price, timestamp, size);
    let event = if portfolio.position.is_open() {
        BacktestEvent::PartialExit {
            timestamp,
            price,
            size: sold,
            remaining: portfolio.position.remaining_size,
        }
    } else {
        BacktestEvent::PositionClosed {
            timestamp,
            kind,
            price,
            size: sold,
        }
    };
    sink.record(&event);
    sold
}

/// Staged ladder, first match wins:
/// 1. first target reached, nothing taken yet: sell `partial_fraction` of what remains
/// 2. second target reached after the first: sell the rest as a partial
/// 3. first target taken but second not reached: sell the rest
fn evaluate_staged_exit(
    portfolio: &mut Portfolio,
    bar: &OhlcvBar,
    params: &StagedExitParams,
    sink: &dyn EventSink,
) {
    let entry = portfolio.position.entry_price;
    let remaining = portfolio.position.remaining_size;
    let close = bar.close;

    match portfolio.position.stage {
        ExitStage::Initial if close >= entry * (1.0 + params.first_target) => {
            let size = remaining * params.partial_fraction;
            emit_exit(portfolio, TradeKind::PartialSell, close, bar.timestamp, size, sink);
            if portfolio.position.is_open() {
                portfolio.position.stage = ExitStage::FirstTargetTaken;
            }
        }
        ExitStage::FirstTargetTaken if close >= entry * (1.0 + params.second_target) => {
            emit_exit(portfolio, TradeKind::PartialSell, close, bar.timestamp, remaining, sink);
        }
        ExitStage::FirstTargetTaken => {
            emit_exit(portfolio, TradeKind::Sell, close, bar.timestamp, remaining, sink);
        }
        ExitStage::Initial => {}
    }
}

fn evaluate_stop_take_exit(portfolio: &mut Portfolio, bar: &OhlcvBar, sink: &dyn EventSink) {
    let position = &portfolio.position;
    if position.should_stop_loss(bar.close) || position.should_take_profit(bar.close) {
        let remaining = position.remaining_size;
        emit_exit(portfolio, TradeKind::Sell, bar.close, bar.timestamp, remaining, sink);
    }
}

pub fn evaluate_exit(
    portfolio: &mut Portfolio,
    bar: &OhlcvBar,
    policy: &ExitPolicy,
    sink: &dyn EventSink,
) {
    if !portfolio.position.is_open() {
        return;
    }
    match policy {
        ExitPolicy::StagedPartial(params) => evaluate_staged_exit(portfolio, bar, params, sink),
        ExitPolicy::StopTakeProfit(_) => evaluate_stop_take_exit(portfolio, bar, sink),
    }
}

/// Process one bar: enter on Buy while Flat, otherwise evaluate the exit
/// policy of an open position, then mark equity at the bar's close.
/// A position opened on this bar is not evaluated for exit until the next.
pub fn step(
    portfolio: &mut Portfolio,
    bar: &OhlcvBar,
    signal: Signal,
    atr: Option<f64>,
    sizing: &SizingParams,
    policy: &ExitPolicy,
    sink: &dyn EventSink,
) {
    if portfolio.position.is_flat() {
        if signal == Signal::Buy {
            try_enter(portfolio, bar, atr, sizing, policy, sink);
        }
    } else {
        evaluate_exit(portfolio, bar, policy, sink);
    }

    let equity = portfolio.total_equity(bar.close);
    portfolio.record_equity(bar.timestamp, equity);
}
