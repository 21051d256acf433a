//! Price data access port trait.

use crate::domain::error::MarketsenseError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

/// Supplies closing prices for a ticker over an inclusive date range.
pub trait PriceSeriesProvider {
    /// Returns the ordered series for `[start, end]`.
    ///
    /// Fails with `DataUnavailable` when the ticker is unknown or the range
    /// yields no points.
    fn get_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketsenseError>;
}
