//! Cash ledger, the single position it owns, and equity tracking.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::{Position, Trade, TradeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Position,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: Position::flat(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Debits cash, opens the position and appends the buy record.
    pub fn buy(
        &mut self,
        price: f64,
        timestamp: NaiveDateTime,
        size: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) {
        self.cash -= size * price;
        self.position.open(price, timestamp, size, stop_loss, take_profit);
        self.record_trade(Trade {
            kind: TradeKind::Buy,
            price,
            timestamp,
            size,
        });
    }

    /// Credits cash for `size` (clamped to what remains) and appends an
    /// exit record of `kind`. Returns the size actually sold.
    pub fn sell(
        &mut self,
        kind: TradeKind,
        price: f64,
        timestamp: NaiveDateTime,
        size: f64,
    ) -> f64 {
        let sold = self.position.reduce(size);
        self.cash += sold * price;
        self.record_trade(Trade {
            kind,
            price,
            timestamp,
            size: sold,
        });
        sold
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert!((portfolio.cash - 100000.0).abs() < f64::EPSILON);
        assert!((portfolio.initial_capital - 100000.0).abs() < f64::EPSILON);
        assert!(portfolio.position.is_flat());
        assert!(portfolio.trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn buy_debits_cash_and_opens() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.buy(100.0, ts(2), 50.0, None, None);

        assert!((portfolio.cash - 95000.0).abs() < f64::EPSILON);
        assert!(portfolio.position.is_open());
        assert_eq!(portfolio.trades.len(), 1);
        assert_eq!(portfolio.trades[0].kind, TradeKind::Buy);
    }

    #[test]
    fn sell_credits_cash_and_records() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.buy(100.0, ts(2), 50.0, None, None);
        let sold = portfolio.sell(TradeKind::PartialSell, 110.0, ts(3), 25.0);

        assert_eq!(sold, 25.0);
        assert!((portfolio.cash - 97750.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.position.remaining_size, 25.0);

        portfolio.sell(TradeKind::Sell, 90.0, ts(4), 25.0);
        assert!(portfolio.position.is_flat());
        assert!((portfolio.cash - 100000.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.trades.len(), 3);
    }

    #[test]
    fn record_equity() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.record_equity(ts(15), 105000.0);
        assert_eq!(portfolio.equity_curve.len(), 1);
        assert_eq!(portfolio.equity_curve[0].timestamp, ts(15));
        assert!((portfolio.equity_curve[0].equity - 105000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_uses_remaining_size() {
        let mut portfolio = Portfolio::new(50000.0);
        portfolio.buy(100.0, ts(1), 100.0, None, None);
        assert!((portfolio.total_equity(150.0) - 55000.0).abs() < f64::EPSILON);

        let flat = Portfolio::new(50000.0);
        assert!((flat.total_equity(150.0) - 50000.0).abs() < f64::EPSILON);
    }
}
