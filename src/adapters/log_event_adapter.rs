//! [`EventSink`] that forwards backtest events to the `log` facade.

use crate::ports::event_port::{BacktestEvent, EventSink};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn level(event: &BacktestEvent) -> log::Level {
        match event {
            BacktestEvent::RunStarted { .. } | BacktestEvent::RunCompleted { .. } => {
                log::Level::Info
            }
            BacktestEvent::PositionOpened { .. }
            | BacktestEvent::PartialExit { .. }
            | BacktestEvent::PositionClosed { .. } => log::Level::Debug,
            BacktestEvent::EntrySkipped { .. } => log::Level::Trace,
        }
    }

    pub fn describe(event: &BacktestEvent) -> String {
        match event {
            BacktestEvent::RunStarted {
                signal,
                exit,
                bars,
                initial_capital,
            } => format!(
                "backtest started: signal={} exit={} bars={} capital={:.2}",
                signal, exit, bars, initial_capital
            ),
            BacktestEvent::PositionOpened {
                timestamp,
                price,
                size,
            } => format!("{} buy {:.4} @ {:.4}", timestamp, size, price),
            BacktestEvent::PartialExit {
                timestamp,
                price,
                size,
                remaining,
            } => format!(
                "{} partial-sell {:.4} @ {:.4}, {:.4} remaining",
                timestamp, size, price, remaining
            ),
            BacktestEvent::PositionClosed {
                timestamp,
                kind,
                price,
                size,
            } => format!("{} {} {:.4} @ {:.4}, position closed", timestamp, kind, size, price),
            BacktestEvent::EntrySkipped { timestamp, reason } => {
                format!("{} entry skipped: {}", timestamp, reason)
            }
            BacktestEvent::RunCompleted {
                trades,
                final_equity,
            } => format!(
                "backtest completed: {} trades, final equity {:.2}",
                trades, final_equity
            ),
        }
    }
}

impl EventSink for LogEventSink {
    fn record(&self, event: &BacktestEvent) {
        log::log!(Self::level(event), "{}", Self::describe(event));
    }
}
