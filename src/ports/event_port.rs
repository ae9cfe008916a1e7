//! Observability port: the backtest core reports what it does through an
//! injected [`EventSink`] rather than logging directly.

use chrono::NaiveDateTime;

use crate::domain::position::TradeKind;

#[derive(Debug, Clone, PartialEq)]
pub enum BacktestEvent {
    RunStarted {
        signal: &'static str,
        exit: &'static str,
        bars: usize,
        initial_capital: f64,
    },
    PositionOpened {
        timestamp: NaiveDateTime,
        price: f64,
        size: f64,
    },
    PartialExit {
        timestamp: NaiveDateTime,
        price: f64,
        size: f64,
        remaining: f64,
    },
    PositionClosed {
        timestamp: NaiveDateTime,
        kind: TradeKind,
        price: f64,
        size: f64,
    },
    EntrySkipped {
        timestamp: NaiveDateTime,
        reason: SkipReason,
    },
    RunCompleted {
        trades: usize,
        final_equity: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AtrUndefined,
    NonPositivePrice,
    ZeroSize,
    InsufficientCash,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AtrUndefined => write!(f, "ATR undefined or not positive"),
            SkipReason::NonPositivePrice => write!(f, "price not positive"),
            SkipReason::ZeroSize => write!(f, "computed size is zero"),
            SkipReason::InsufficientCash => write!(f, "cash below entry cost"),
        }
    }
}

pub trait EventSink {
    fn record(&self, event: &BacktestEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _event: &BacktestEvent) {}
}
