//! MACD: EMA(fast) - EMA(slow), with an EMA(signal) of that line.
//!
//! A point is valid once the signal line is seeded, i.e. from index
//! `slow - 1 + signal - 1` onward.

use super::ema::ema_values;
use super::{IndicatorKind, IndicatorSeries, IndicatorValue, closes};
use crate::domain::price::PricePoint;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    points: &[PricePoint],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let kind = IndicatorKind::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let n = points.len();
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::from_values(kind, points, vec![None; n], |v: IndicatorValue| v);
    }

    let xs = closes(points);
    let ema_fast = ema_values(&xs, fast);
    let ema_slow = ema_values(&xs, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // Signal EMA over the defined stretch of the MACD line only.
    let first = line.iter().position(Option::is_some).unwrap_or(n);
    let defined: Vec<f64> = line[first..].iter().flatten().copied().collect();
    let mut signal = vec![None; first];
    signal.extend(ema_values(&defined, signal_period));

    let values = line.iter().zip(&signal).map(|(l, s)| {
        let (line, signal) = ((*l)?, (*s)?);
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram: line - signal,
        })
    });

    IndicatorSeries::from_values(kind, points, values, |v: IndicatorValue| v)
}

pub fn calculate_macd_default(points: &[PricePoint]) -> IndicatorSeries {
    calculate_macd(points, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
