//! Rate of change as a fraction.
//!
//! ROC(n)[i] = C[i] / C[i-n] - 1. The first n points are warmup.

use super::{IndicatorKind, IndicatorSeries, IndicatorValue, closes};
use crate::domain::price::PricePoint;

pub fn calculate_roc(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let xs = closes(points);
    let values = (0..xs.len()).map(|i| {
        if period == 0 || i < period || xs[i - period] <= 0.0 {
            None
        } else {
            Some(xs[i] / xs[i - period] - 1.0)
        }
    });
    IndicatorSeries::from_values(IndicatorKind::Roc(period), points, values, IndicatorValue::Simple)
}
