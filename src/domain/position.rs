//! Simulation position state and the trade ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Cash and share holdings for a single-ticker simulation.
///
/// Both fields stay non-negative at every step; shorting is not representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub cash: f64,
    pub shares: f64,
}

impl Position {
    pub fn new(cash: f64) -> Self {
        Position { cash, shares: 0.0 }
    }

    pub fn is_flat(&self) -> bool {
        self.shares <= 0.0
    }

    pub fn is_long(&self) -> bool {
        self.shares > 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Immutable ledger entry.
///
/// `executed_price` includes slippage. `notional_value` is the cash debited on a
/// buy (commission included) or credited on a sell (commission deducted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub executed_price: f64,
    pub shares: f64,
    pub notional_value: f64,
}
