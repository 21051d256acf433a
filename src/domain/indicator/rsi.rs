//! Relative Strength Index with Wilder smoothing.
//!
//! The first averages are simple means of the first n gains and losses;
//! afterwards avg = (prev * (n-1) + current) / n. RSI is 100 when the
//! average loss is zero. The first n points are warmup.

use super::{IndicatorKind, IndicatorSeries, IndicatorValue, closes};
use crate::domain::price::PricePoint;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(points: &[PricePoint], period: usize) -> IndicatorSeries {
    IndicatorSeries::from_values(
        IndicatorKind::Rsi(period),
        points,
        rsi_values(&closes(points), period),
        IndicatorValue::Simple,
    )
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

fn rsi_values(xs: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; xs.len()];
    if period == 0 || xs.len() <= period {
        return out;
    }

    let changes: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let n = period as f64;
    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / n;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / n;
    out[period] = Some(rsi_from(avg_gain, avg_loss));

    for (i, &c) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (n - 1.0) + gain(c)) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss(c)) / n;
        out[i + 1] = Some(rsi_from(avg_gain, avg_loss));
    }
    out
}
