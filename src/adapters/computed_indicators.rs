//! Indicator provider computed on demand from a price provider.
//!
//! The first lookup for a ticker fetches its prices from
//! `warmup_days` before the requested date through the horizon (or the
//! requested date, if later) and computes every fixed-period series once.
//! `roc_<n>` series are computed the first time each `n` is asked for. All
//! calculators are causal, so a value on date `d` only depends on closes up
//! to and including `d` even though later closes are in the cache.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::domain::config_validation::DEFAULT_INDICATOR_WARMUP_DAYS;
use crate::domain::error::MarketsenseError;
use crate::domain::indicator::{
    IndicatorKind, IndicatorSeries, IndicatorValue, bollinger, calculate_bollinger,
    calculate_macd, calculate_roc, calculate_rsi, calculate_sma, macd, rsi,
};
use crate::domain::price::PricePoint;
use crate::ports::indicator_port::IndicatorProvider;
use crate::ports::price_port::PriceSeriesProvider;

const SMA_PERIODS: [usize; 3] = [20, 50, 200];

const MACD_KIND: IndicatorKind = IndicatorKind::Macd {
    fast: macd::DEFAULT_FAST,
    slow: macd::DEFAULT_SLOW,
    signal: macd::DEFAULT_SIGNAL,
};

const BOLLINGER_KIND: IndicatorKind = IndicatorKind::Bollinger {
    period: bollinger::DEFAULT_PERIOD,
    stddev_mult_x100: bollinger::DEFAULT_STDDEV_MULT_X100,
};

/// Which component of a series a public name refers to.
#[derive(Debug, Clone, Copy)]
enum Component {
    Simple,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    Upper,
    Middle,
    Lower,
}

impl Component {
    fn extract(self, value: IndicatorValue) -> Option<f64> {
        match (self, value) {
            (Component::Simple, IndicatorValue::Simple(v)) => Some(v),
            (Component::MacdLine, IndicatorValue::Macd { line, .. }) => Some(line),
            (Component::MacdSignal, IndicatorValue::Macd { signal, .. }) => Some(signal),
            (Component::MacdHistogram, IndicatorValue::Macd { histogram, .. }) => Some(histogram),
            (Component::Upper, IndicatorValue::Bollinger { upper, .. }) => Some(upper),
            (Component::Middle, IndicatorValue::Bollinger { middle, .. }) => Some(middle),
            (Component::Lower, IndicatorValue::Bollinger { lower, .. }) => Some(lower),
            _ => None,
        }
    }
}

fn resolve(name: &str) -> Option<(IndicatorKind, Component)> {
    let resolved = match name {
        "sma_20" => (IndicatorKind::Sma(20), Component::Simple),
        "sma_50" => (IndicatorKind::Sma(50), Component::Simple),
        "sma_200" => (IndicatorKind::Sma(200), Component::Simple),
        "rsi" => (IndicatorKind::Rsi(rsi::DEFAULT_PERIOD), Component::Simple),
        "macd" => (MACD_KIND, Component::MacdLine),
        "macd_signal" => (MACD_KIND, Component::MacdSignal),
        "macd_histogram" => (MACD_KIND, Component::MacdHistogram),
        "bb_upper" => (BOLLINGER_KIND, Component::Upper),
        "bb_middle" => (BOLLINGER_KIND, Component::Middle),
        "bb_lower" => (BOLLINGER_KIND, Component::Lower),
        other => {
            let period = other.strip_prefix("roc_")?.parse::<usize>().ok()?;
            if period == 0 {
                return None;
            }
            (IndicatorKind::Roc(period), Component::Simple)
        }
    };
    Some(resolved)
}

struct TickerIndicators {
    start: NaiveDate,
    fetched_end: NaiveDate,
    points: Vec<PricePoint>,
    series: HashMap<IndicatorKind, IndicatorSeries>,
}

pub struct ComputedIndicatorAdapter<'a> {
    prices: &'a dyn PriceSeriesProvider,
    warmup_days: i64,
    horizon: Option<NaiveDate>,
    cache: RefCell<HashMap<String, TickerIndicators>>,
}

impl<'a> ComputedIndicatorAdapter<'a> {
    pub fn new(prices: &'a dyn PriceSeriesProvider, warmup_days: i64) -> Self {
        Self {
            prices,
            warmup_days,
            horizon: None,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_default_warmup(prices: &'a dyn PriceSeriesProvider) -> Self {
        Self::new(prices, DEFAULT_INDICATOR_WARMUP_DAYS)
    }

    /// Fetch through `end` on first use so a whole backtest needs one fetch.
    pub fn with_horizon(mut self, end: NaiveDate) -> Self {
        self.horizon = Some(end);
        self
    }

    fn load(&self, ticker: &str, date: NaiveDate) -> Result<(), MarketsenseError> {
        let cached = self.cache.borrow().get(ticker).map(|c| (c.start, c.fetched_end));
        let (start, end) = match cached {
            Some((_, fetched_end)) if date <= fetched_end => return Ok(()),
            // Keep the original start so previously served values stay stable.
            Some((start, _)) => (start, date.max(self.horizon.unwrap_or(date))),
            None => (
                date - Duration::days(self.warmup_days),
                date.max(self.horizon.unwrap_or(date)),
            ),
        };

        let series = self
            .prices
            .get_prices(ticker, start, end)
            .map_err(|e| MarketsenseError::IndicatorLookup {
                ticker: ticker.to_string(),
                name: "prices".to_string(),
                reason: e.to_string(),
            })?;
        let points = series.points();

        let mut computed = HashMap::new();
        for period in SMA_PERIODS {
            computed.insert(IndicatorKind::Sma(period), calculate_sma(points, period));
        }
        computed.insert(
            IndicatorKind::Rsi(rsi::DEFAULT_PERIOD),
            calculate_rsi(points, rsi::DEFAULT_PERIOD),
        );
        computed.insert(
            MACD_KIND,
            calculate_macd(points, macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL),
        );
        computed.insert(
            BOLLINGER_KIND,
            calculate_bollinger(
                points,
                bollinger::DEFAULT_PERIOD,
                bollinger::DEFAULT_STDDEV_MULT_X100,
            ),
        );

        debug!(ticker, %start, %end, points = points.len(), "indicators computed");

        self.cache.borrow_mut().insert(
            ticker.to_string(),
            TickerIndicators {
                start,
                fetched_end: end,
                points: points.to_vec(),
                series: computed,
            },
        );
        Ok(())
    }
}

impl IndicatorProvider for ComputedIndicatorAdapter<'_> {
    fn get_indicator(
        &self,
        ticker: &str,
        date: NaiveDate,
        name: &str,
    ) -> Result<Option<f64>, MarketsenseError> {
        let (kind, component) = resolve(name).ok_or_else(|| MarketsenseError::IndicatorLookup {
            ticker: ticker.to_string(),
            name: name.to_string(),
            reason: "unknown indicator".to_string(),
        })?;

        self.load(ticker, date)?;

        if let IndicatorKind::Roc(period) = kind {
            let mut cache = self.cache.borrow_mut();
            if let Some(entry) = cache.get_mut(ticker) {
                let points = &entry.points;
                entry
                    .series
                    .entry(kind)
                    .or_insert_with(|| calculate_roc(points, period));
            }
        }

        let cache = self.cache.borrow();
        Ok(cache
            .get(ticker)
            .and_then(|entry| entry.series.get(&kind))
            .and_then(|series| series.on(date))
            .and_then(|value| component.extract(value)))
    }
}
