//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MarketsenseError;
use crate::domain::optimizer::OptimizedPortfolio;

/// Port for emitting run results.
pub trait ReportPort {
    fn write_backtest(&self, result: &BacktestResult) -> Result<(), MarketsenseError>;

    fn write_comparison(&self, results: &[BacktestResult]) -> Result<(), MarketsenseError>;

    fn write_portfolio(&self, portfolio: &OptimizedPortfolio) -> Result<(), MarketsenseError>;
}
