//! Bollinger Bands: SMA(n) middle band, upper/lower at `mult` population
//! standard deviations. The first n-1 points are warmup.

use super::{IndicatorKind, IndicatorSeries, IndicatorValue, closes};
use crate::domain::price::PricePoint;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STDDEV_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    points: &[PricePoint],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let xs = closes(points);

    let values = (0..xs.len()).map(|i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = &xs[i + 1 - period..=i];
        let middle = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / period as f64;
        let band = mult * variance.sqrt();
        Some(IndicatorValue::Bollinger {
            upper: middle + band,
            middle,
            lower: middle - band,
        })
    });

    IndicatorSeries::from_values(
        IndicatorKind::Bollinger {
            period,
            stddev_mult_x100,
        },
        points,
        values,
        |v: IndicatorValue| v,
    )
}
