#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use marketsense::domain::error::MarketsenseError;
use marketsense::domain::price::{PricePoint, PriceSeries};
use marketsense::ports::indicator_port::IndicatorProvider;
use marketsense::ports::price_port::PriceSeriesProvider;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting 2024-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + Duration::days(i as i64)
}

pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(day(i), c))
        .collect()
}

pub struct MockPriceProvider {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_closes(self, ticker: &str, closes: &[f64]) -> Self {
        self.with_points(ticker, make_points(closes))
    }

    pub fn with_points(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceSeriesProvider for MockPriceProvider {
    fn get_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketsenseError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MarketsenseError::data_unavailable(ticker, reason.clone()));
        }
        let points: Vec<PricePoint> = self
            .data
            .get(ticker)
            .ok_or_else(|| MarketsenseError::data_unavailable(ticker, "unknown ticker"))?
            .iter()
            .copied()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        if points.is_empty() {
            return Err(MarketsenseError::data_unavailable(ticker, "empty range"));
        }
        PriceSeries::new(ticker, points)
    }
}

/// Indicator values keyed by (name, date); anything else is absent.
pub struct MockIndicatorProvider {
    pub values: HashMap<(String, NaiveDate), f64>,
    pub fail: bool,
}

impl MockIndicatorProvider {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            values: HashMap::new(),
            fail: true,
        }
    }

    pub fn with(mut self, name: &str, date: NaiveDate, value: f64) -> Self {
        self.values.insert((name.to_string(), date), value);
        self
    }

    /// Same value for `name` on days `0..n`.
    pub fn with_constant(mut self, name: &str, n: usize, value: f64) -> Self {
        for i in 0..n {
            self.values.insert((name.to_string(), day(i)), value);
        }
        self
    }
}

impl IndicatorProvider for MockIndicatorProvider {
    fn get_indicator(
        &self,
        ticker: &str,
        date: NaiveDate,
        name: &str,
    ) -> Result<Option<f64>, MarketsenseError> {
        if self.fail {
            return Err(MarketsenseError::IndicatorLookup {
                ticker: ticker.to_string(),
                name: name.to_string(),
                reason: "provider offline".to_string(),
            });
        }
        Ok(self.values.get(&(name.to_string(), date)).copied())
    }
}

/// Deterministic zig-zag series with a drift, long enough for every indicator.
pub fn zigzag(n: usize, start: f64, drift: f64, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let wave = if i % 7 < 4 { amplitude } else { -amplitude };
            start + drift * i as f64 + wave * ((i % 4) as f64)
        })
        .collect()
}

pub fn write_price_csv(dir: &Path, ticker: &str, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        content.push_str(&format!(
            "{},{c},{c},{c},{c},1000\n",
            day(i).format("%Y-%m-%d")
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", ticker)), content).unwrap();
}

/// Deterministic random walk for a given seed.
pub fn noisy_walk(n: usize, seed: u64, drift: f64, vol: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut price = 100.0;
    let mut closes = Vec::with_capacity(n);
    for _ in 0..n {
        closes.push(price);
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let u = (state >> 11) as f64 / (1u64 << 53) as f64;
        price *= 1.0 + drift + vol * (2.0 * u - 1.0);
    }
    closes
}
