//! Single-asset position state and the trade records it emits.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sizes below this are treated as fully exited.
const SIZE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open,
}

/// Progress through the staged partial-exit ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitStage {
    #[default]
    Initial,
    FirstTargetTaken,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position {
    pub state: PositionState,
    pub entry_price: f64,
    pub entry_timestamp: Option<NaiveDateTime>,
    pub original_size: f64,
    pub remaining_size: f64,
    pub stage: ExitStage,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    pub fn is_flat(&self) -> bool {
        self.state == PositionState::Flat
    }

    pub fn open(
        &mut self,
        price: f64,
        timestamp: NaiveDateTime,
        size: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) {
        *self = Position {
            state: PositionState::Open,
            entry_price: price,
            entry_timestamp: Some(timestamp),
            original_size: size,
            remaining_size: size,
            stage: ExitStage::Initial,
            stop_loss,
            take_profit,
        };
    }

    /// Takes `size` off the position (clamped to what remains) and returns
    /// the size actually removed. Goes Flat once nothing is left.
    pub fn reduce(&mut self, size: f64) -> f64 {
        let taken = size.clamp(0.0, self.remaining_size);
        self.remaining_size -= taken;
        if self.remaining_size <= SIZE_EPSILON {
            self.close();
        }
        taken
    }

    pub fn close(&mut self) {
        *self = Position::flat();
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.remaining_size * price
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        matches!(self.stop_loss, Some(stop) if price <= stop)
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        matches!(self.take_profit, Some(take) if price >= take)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeKind {
    Buy,
    Sell,
    PartialSell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::PartialSell => "partial-sell",
        }
    }

    pub fn is_exit(&self) -> bool {
        !matches!(self, TradeKind::Buy)
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub kind: TradeKind,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub size: f64,
}

impl Trade {
    pub fn value(&self) -> f64 {
        self.price * self.size
    }
}

/// A buy and the exits that followed it, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry: Trade,
    pub exits: Vec<Trade>,
}

impl RoundTrip {
    pub fn exited_size(&self) -> f64 {
        self.exits.iter().map(|t| t.size).sum()
    }

    pub fn is_closed(&self) -> bool {
        self.entry.size - self.exited_size() <= SIZE_EPSILON
    }

    /// Realized profit of the exits taken so far.
    pub fn pnl(&self) -> f64 {
        self.exits
            .iter()
            .map(|t| (t.price - self.entry.price) * t.size)
            .sum()
    }

    pub fn exit_timestamp(&self) -> Option<NaiveDateTime> {
        self.exits.last().map(|t| t.timestamp)
    }

    pub fn holding_days(&self) -> Option<i64> {
        self.exit_timestamp()
            .map(|exit| (exit - self.entry.timestamp).num_days())
    }
}

/// Pairs each buy with the exits that follow it. Exits before the first
/// buy are ignored.
pub fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut trips: Vec<RoundTrip> = Vec::new();
    for trade in trades {
        match trade.kind {
            TradeKind::Buy => trips.push(RoundTrip {
                entry: trade.clone(),
                exits: Vec::new(),
            }),
            TradeKind::Sell | TradeKind::PartialSell => {
                if let Some(trip) = trips.last_mut() {
                    trip.exits.push(trade.clone());
                }
            }
        }
    }
    trips
}
