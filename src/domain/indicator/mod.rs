//! Technical indicators computed from closing prices.
//!
//! Every calculator returns an [`IndicatorSeries`] aligned one-to-one with
//! its input points. Points inside an indicator's warmup carry no value.

pub mod bollinger;
mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use macd::calculate_macd;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDate;
use std::fmt;

use super::price::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    /// `None` during warmup.
    pub value: Option<IndicatorValue>,
}

/// Indicator identity plus parameters. Usable as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Rsi(usize),
    Roc(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value on `date`, or `None` when the date is absent or still warming up.
    pub fn on(&self, date: NaiveDate) -> Option<IndicatorValue> {
        let idx = self.values.binary_search_by_key(&date, |p| p.date).ok()?;
        self.values[idx].value
    }

    /// Pair each computed value with its input date.
    fn from_values<T>(
        kind: IndicatorKind,
        points: &[PricePoint],
        values: impl IntoIterator<Item = Option<T>>,
        wrap: impl Fn(T) -> IndicatorValue,
    ) -> Self {
        IndicatorSeries {
            kind,
            values: points
                .iter()
                .zip(values)
                .map(|(p, v)| IndicatorPoint {
                    date: p.date,
                    value: v.map(&wrap),
                })
                .collect(),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Roc(period) => write!(f, "ROC({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

fn closes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}

#[cfg(test)]
pub(crate) fn make_points(prices: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(start + chrono::Duration::days(i as i64), close))
        .collect()
}
