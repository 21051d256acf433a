//! Trade execution and fill simulation.
//!
//! Buys and sells are always full-position: a buy spends a fixed fraction of
//! available cash, a sell liquidates every share held. Slippage moves the
//! execution price against the trader; commission is charged on notional.

use chrono::NaiveDate;

use super::error::MarketsenseError;
use super::position::{Position, Trade, TradeAction};

pub const DEFAULT_COMMISSION: f64 = 0.0015;
pub const DEFAULT_SLIPPAGE: f64 = 0.0005;

/// Fraction of available cash committed on a buy signal.
///
/// The remaining 1% headroom absorbs commission and rounding so the
/// commission-inclusive cost stays below cash. Overridable per run.
pub const DEFAULT_BUY_CASH_FRACTION: f64 = 0.99;

/// Friction parameters for simulated fills. All rates are fractions (0.0015 = 0.15%).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    commission: f64,
    slippage: f64,
    buy_cash_fraction: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission: DEFAULT_COMMISSION,
            slippage: DEFAULT_SLIPPAGE,
            buy_cash_fraction: DEFAULT_BUY_CASH_FRACTION,
        }
    }
}

impl ExecutionConfig {
    pub fn new(
        commission: f64,
        slippage: f64,
        buy_cash_fraction: f64,
    ) -> Result<Self, MarketsenseError> {
        if !commission.is_finite() || commission < 0.0 {
            return Err(MarketsenseError::invalid_parameter(
                "commission",
                "must be a non-negative fraction",
            ));
        }
        if !slippage.is_finite() || slippage < 0.0 {
            return Err(MarketsenseError::invalid_parameter(
                "slippage",
                "must be a non-negative fraction",
            ));
        }
        if !(buy_cash_fraction > 0.0 && buy_cash_fraction <= 1.0) {
            return Err(MarketsenseError::invalid_parameter(
                "buy_cash_fraction",
                "must be in (0, 1]",
            ));
        }
        Ok(ExecutionConfig {
            commission,
            slippage,
            buy_cash_fraction,
        })
    }

    /// No commission, no slippage, full cash deployment.
    pub fn frictionless() -> Self {
        ExecutionConfig {
            commission: 0.0,
            slippage: 0.0,
            buy_cash_fraction: 1.0,
        }
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn slippage(&self) -> f64 {
        self.slippage
    }

    pub fn buy_cash_fraction(&self) -> f64 {
        self.buy_cash_fraction
    }
}

/// Buy-side execution price: market_price * (1 + slippage).
pub fn apply_slippage_buy(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

/// Sell-side execution price: market_price * (1 - slippage).
pub fn apply_slippage_sell(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Filled(Trade),
    NoCash,
    NoShares,
    CostExceedsCash { cost: f64, cash: f64 },
}

/// Enter a long position with a fraction of available cash.
///
/// shares = (cash * buy_cash_fraction) / effective_price,
/// cost = shares * effective_price * (1 + commission).
pub fn execute_buy(
    position: &mut Position,
    date: NaiveDate,
    market_price: f64,
    config: &ExecutionConfig,
) -> Fill {
    if position.cash <= 0.0 {
        return Fill::NoCash;
    }

    let execution_price = apply_slippage_buy(market_price, config.slippage);
    let notional = position.cash * config.buy_cash_fraction;
    let shares = notional / execution_price;
    let cost = shares * execution_price * (1.0 + config.commission);

    if cost > position.cash {
        return Fill::CostExceedsCash {
            cost,
            cash: position.cash,
        };
    }

    position.cash -= cost;
    position.shares += shares;

    Fill::Filled(Trade {
        date,
        action: TradeAction::Buy,
        executed_price: execution_price,
        shares,
        notional_value: cost,
    })
}

/// Liquidate the entire position.
///
/// proceeds = shares * effective_price * (1 - commission).
pub fn execute_sell(
    position: &mut Position,
    date: NaiveDate,
    market_price: f64,
    config: &ExecutionConfig,
) -> Fill {
    if position.shares <= 0.0 {
        return Fill::NoShares;
    }

    let execution_price = apply_slippage_sell(market_price, config.slippage);
    let shares = position.shares;
    let proceeds = shares * execution_price * (1.0 - config.commission);

    position.cash += proceeds;
    position.shares = 0.0;

    Fill::Filled(Trade {
        date,
        action: TradeAction::Sell,
        executed_price: execution_price,
        shares,
        notional_value: proceeds,
    })
}
