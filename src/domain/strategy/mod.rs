//! Trading strategy contract and registry.
//!
//! A strategy inspects one simulated day and returns a [`Signal`]. It sees
//! the price history up to and including that day only, plus an indicator
//! provider; the engine decides whether the signal turns into a trade.

pub mod ai_score;
pub mod technical;

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::MarketsenseError;
use crate::domain::price::PricePoint;
use crate::ports::indicator_port::IndicatorProvider;

pub use ai_score::{AiScoreStrategy, IndicatorSnapshot, calculate_ai_score};
pub use technical::{
    BollingerBandsStrategy, MacdStrategy, MomentumStrategy, RsiStrategy, SmaCrossoverStrategy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Everything a strategy may look at for one simulated day.
pub struct StrategyContext<'a> {
    pub ticker: &'a str,
    pub date: NaiveDate,
    pub price: f64,
    pub cash: f64,
    pub shares: f64,
    pub indicators: &'a dyn IndicatorProvider,
    /// Prices up to and including `date`.
    pub history: &'a [PricePoint],
}

impl StrategyContext<'_> {
    pub fn indicator(&self, name: &str) -> Result<Option<f64>, MarketsenseError> {
        self.indicators.get_indicator(self.ticker, self.date, name)
    }

    pub fn is_flat(&self) -> bool {
        self.shares <= 0.0
    }

    pub fn is_long(&self) -> bool {
        self.shares > 0.0
    }
}

pub trait Strategy {
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError>;
}

/// Registered strategies, addressable by stable snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    SmaCrossover,
    Rsi,
    Macd,
    BollingerBands,
    Momentum,
    AiScore,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::SmaCrossover,
        StrategyKind::Rsi,
        StrategyKind::Macd,
        StrategyKind::BollingerBands,
        StrategyKind::Momentum,
        StrategyKind::AiScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover => "sma_crossover",
            StrategyKind::Rsi => "rsi",
            StrategyKind::Macd => "macd",
            StrategyKind::BollingerBands => "bollinger_bands",
            StrategyKind::Momentum => "momentum",
            StrategyKind::AiScore => "ai_score",
        }
    }

    /// Build the strategy with its default parameters.
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::SmaCrossover => Box::new(SmaCrossoverStrategy),
            StrategyKind::Rsi => Box::new(RsiStrategy::default()),
            StrategyKind::Macd => Box::new(MacdStrategy),
            StrategyKind::BollingerBands => Box::new(BollingerBandsStrategy),
            StrategyKind::Momentum => Box::new(MomentumStrategy::default()),
            StrategyKind::AiScore => Box::new(AiScoreStrategy::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = MarketsenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
                MarketsenseError::invalid_parameter(
                    "strategy",
                    format!("unknown strategy '{}' (expected one of {})", s, names.join(", ")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_name() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!(
            " SMA_Crossover ".parse::<StrategyKind>().unwrap(),
            StrategyKind::SmaCrossover
        );
    }

    #[test]
    fn unknown_kind_lists_choices() {
        let err = "golden_cross".parse::<StrategyKind>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("golden_cross"));
        assert!(msg.contains("bollinger_bands"));
    }

    #[test]
    fn built_strategies_report_registry_names() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.build().name(), kind.as_str());
        }
    }
}
