//! Technical indicator access port trait.

use crate::domain::error::MarketsenseError;
use chrono::NaiveDate;

/// Supplies named per-date indicator values (`sma_20`, `rsi`, `bb_upper`, ...).
pub trait IndicatorProvider {
    /// `Ok(None)` means the indicator has no value on that date (warmup or gap).
    fn get_indicator(
        &self,
        ticker: &str,
        date: NaiveDate,
        name: &str,
    ) -> Result<Option<f64>, MarketsenseError>;
}
