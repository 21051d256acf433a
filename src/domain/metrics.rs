//! Performance metrics and statistics.
//!
//! Annualization conventions used across the crate:
//! - CAGR compounds over calendar days elapsed, 365.25 days per year.
//! - Volatility scales the daily sample standard deviation by sqrt(252).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::Trade;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.035;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub num_trades: usize,
    pub benchmark_return: Option<f64>,
    pub alpha: Option<f64>,
}

/// Derive return and risk statistics from a portfolio-value series.
///
/// `benchmark_returns` are daily simple returns of a passive reference; when
/// given, the benchmark total return compounds geometrically and alpha is
/// the strategy total return minus it.
pub fn calculate_metrics(
    values: &[ValuePoint],
    trades: &[Trade],
    benchmark_returns: Option<&[f64]>,
    risk_free_rate: f64,
) -> PerformanceMetrics {
    let (initial_value, final_value) = match (values.first(), values.last()) {
        (Some(first), Some(last)) => (first.value, last.value),
        _ => (0.0, 0.0),
    };

    let total_return = if initial_value > 0.0 {
        final_value / initial_value - 1.0
    } else {
        0.0
    };

    let days = match (values.first(), values.last()) {
        (Some(first), Some(last)) => (last.date - first.date).num_days(),
        _ => 0,
    };
    let annual_return = annualized_return(initial_value, final_value, days);

    let daily = daily_returns(values);
    let volatility = sample_std(&daily) * TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe_ratio = if volatility > 0.0 {
        (annual_return - risk_free_rate) / volatility
    } else {
        0.0
    };

    let max_drawdown = max_drawdown(values);

    let win_rate = if daily.is_empty() {
        0.0
    } else {
        daily.iter().filter(|&&r| r > 0.0).count() as f64 / daily.len() as f64
    };

    let benchmark_return =
        benchmark_returns.map(|r| r.iter().fold(1.0, |acc, x| acc * (1.0 + x)) - 1.0);
    let alpha = benchmark_return.map(|b| total_return - b);

    PerformanceMetrics {
        initial_value,
        final_value,
        total_return,
        annual_return,
        volatility,
        sharpe_ratio,
        max_drawdown,
        win_rate,
        num_trades: trades.len(),
        benchmark_return,
        alpha,
    }
}

/// CAGR over `days` calendar days; 0 when the range is degenerate.
pub fn annualized_return(initial_value: f64, final_value: f64, days: i64) -> f64 {
    if days <= 0 || initial_value <= 0.0 {
        return 0.0;
    }
    let growth = final_value / initial_value;
    let result = growth.powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0;
    if result.is_finite() { result } else { 0.0 }
}

/// Percentage change of consecutive values, first element dropped.
pub fn daily_returns(values: &[ValuePoint]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            if w[0].value > 0.0 {
                w[1].value / w[0].value - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1); 0 with fewer than two observations.
pub fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

/// min_t (V_t - peak_t) / peak_t, always <= 0.
pub fn max_drawdown(values: &[ValuePoint]) -> f64 {
    let Some(first) = values.first() else {
        return 0.0;
    };

    let mut peak = first.value;
    let mut worst = 0.0_f64;
    for point in values {
        if point.value > peak {
            peak = point.value;
        } else if peak > 0.0 {
            let dd = (point.value - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}
