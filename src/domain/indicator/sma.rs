//! Simple moving average over the trailing `period` closes.

use super::{IndicatorKind, IndicatorSeries, IndicatorValue, closes};
use crate::domain::price::PricePoint;

pub fn calculate_sma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    IndicatorSeries::from_values(
        IndicatorKind::Sma(period),
        points,
        sma_values(&closes(points), period),
        IndicatorValue::Simple,
    )
}

/// Rolling mean; the first `period - 1` entries are `None`.
pub(crate) fn sma_values(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }
    let mut out = Vec::with_capacity(closes.len());
    let mut sum = 0.0;
    for (i, c) in closes.iter().enumerate() {
        sum += c;
        if i >= period {
            sum -= closes[i - period];
        }
        out.push((i + 1 >= period).then(|| sum / period as f64));
    }
    out
}
