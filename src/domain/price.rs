//! Closing-price series for a single ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::MarketsenseError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }
}

/// Ordered (date, close) pairs for one ticker.
///
/// Dates are strictly increasing; only trading days are present, so no
/// calendar contiguity is assumed. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: &str, points: Vec<PricePoint>) -> Result<Self, MarketsenseError> {
        for w in points.windows(2) {
            if w[1].date <= w[0].date {
                return Err(MarketsenseError::data_unavailable(
                    ticker,
                    format!("dates not strictly increasing at {}", w[1].date),
                ));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(MarketsenseError::data_unavailable(
                ticker,
                format!("invalid close {} on {}", bad.close, bad.date),
            ));
        }
        Ok(PriceSeries {
            ticker: ticker.to_string(),
            points,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Simple daily returns dated by the later point; the first point has none.
    pub fn daily_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect()
    }
}
