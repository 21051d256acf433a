//! Single-indicator strategies.
//!
//! Every policy is gated by the current position: entries only fire when
//! flat, exits only when long. A missing indicator value yields `Hold`.

use crate::domain::error::MarketsenseError;

use super::{Signal, Strategy, StrategyContext};

pub const SMA_FAST: &str = "sma_20";
pub const SMA_SLOW: &str = "sma_50";
pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const BB_UPPER: &str = "bb_upper";
pub const BB_MIDDLE: &str = "bb_middle";
pub const BB_LOWER: &str = "bb_lower";

fn gate(ctx: &StrategyContext<'_>, buy: bool, sell: bool) -> Signal {
    if buy && ctx.is_flat() {
        Signal::Buy
    } else if sell && ctx.is_long() {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Golden cross / death cross on SMA20 vs SMA50.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCrossoverStrategy;

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        let (Some(fast), Some(slow)) = (ctx.indicator(SMA_FAST)?, ctx.indicator(SMA_SLOW)?) else {
            return Ok(Signal::Hold);
        };
        Ok(gate(ctx, fast > slow, fast < slow))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RsiStrategy {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiStrategy {
    fn default() -> Self {
        RsiStrategy {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "rsi"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        let Some(rsi) = ctx.indicator(RSI)? else {
            return Ok(Signal::Hold);
        };
        Ok(gate(ctx, rsi < self.oversold, rsi > self.overbought))
    }
}

/// MACD line against its signal line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacdStrategy;

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        "macd"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        let (Some(macd), Some(signal)) = (ctx.indicator(MACD)?, ctx.indicator(MACD_SIGNAL)?)
        else {
            return Ok(Signal::Hold);
        };
        Ok(gate(ctx, macd > signal, macd < signal))
    }
}

/// Buy below the lower band, sell above the upper band.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerBandsStrategy;

impl Strategy for BollingerBandsStrategy {
    fn name(&self) -> &str {
        "bollinger_bands"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        let (Some(upper), Some(lower)) = (ctx.indicator(BB_UPPER)?, ctx.indicator(BB_LOWER)?)
        else {
            return Ok(Signal::Hold);
        };
        Ok(gate(ctx, ctx.price < lower, ctx.price > upper))
    }
}

/// Trailing N-trading-day return against a symmetric threshold.
///
/// The reference price is the close `lookback - 1` trading days before the
/// current day. The return comes from the provider's `roc_<lookback - 1>`
/// so closes before the backtest window count; when the provider has no
/// value the in-window history is used, which needs `lookback` points.
#[derive(Debug, Clone, Copy)]
pub struct MomentumStrategy {
    pub lookback: usize,
    pub threshold: f64,
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        MomentumStrategy {
            lookback: 20,
            threshold: 0.05,
        }
    }
}

impl MomentumStrategy {
    fn from_history(&self, ctx: &StrategyContext<'_>) -> Option<f64> {
        let len = ctx.history.len();
        if len < self.lookback {
            return None;
        }
        let past = ctx.history[len - self.lookback].close;
        (past > 0.0).then(|| ctx.price / past - 1.0)
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        if self.lookback < 2 {
            return Ok(Signal::Hold);
        }
        let momentum = match ctx.indicator(&format!("roc_{}", self.lookback - 1))? {
            Some(roc) => roc,
            None => match self.from_history(ctx) {
                Some(m) => m,
                None => return Ok(Signal::Hold),
            },
        };
        Ok(gate(
            ctx,
            momentum > self.threshold,
            momentum < -self.threshold,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use crate::ports::indicator_port::IndicatorProvider;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct FixedIndicators {
        pub values: HashMap<&'static str, f64>,
        pub fail: bool,
    }

    impl FixedIndicators {
        pub(crate) fn with(mut self, name: &'static str, value: f64) -> Self {
            self.values.insert(name, value);
            self
        }
    }

    impl IndicatorProvider for FixedIndicators {
        fn get_indicator(
            &self,
            ticker: &str,
            _date: NaiveDate,
            name: &str,
        ) -> Result<Option<f64>, MarketsenseError> {
            if self.fail {
                return Err(MarketsenseError::IndicatorLookup {
                    ticker: ticker.to_string(),
                    name: name.to_string(),
                    reason: "store offline".into(),
                });
            }
            Ok(self.values.get(name).copied())
        }
    }

    pub(crate) fn ctx<'a>(
        indicators: &'a dyn IndicatorProvider,
        history: &'a [PricePoint],
        price: f64,
        shares: f64,
    ) -> StrategyContext<'a> {
        StrategyContext {
            ticker: "005930",
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            price,
            cash: if shares > 0.0 { 0.0 } else { 1_000_000.0 },
            shares,
            indicators,
            history,
        }
    }

    fn history(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PricePoint::new(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    c,
                )
            })
            .collect()
    }

    #[test]
    fn sma_golden_cross_buys_when_flat() {
        let ind = FixedIndicators::default().with(SMA_FAST, 105.0).with(SMA_SLOW, 100.0);
        let s = SmaCrossoverStrategy;
        assert_eq!(s.evaluate(&ctx(&ind, &[], 110.0, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(s.evaluate(&ctx(&ind, &[], 110.0, 10.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn sma_death_cross_sells_when_long() {
        let ind = FixedIndicators::default().with(SMA_FAST, 95.0).with(SMA_SLOW, 100.0);
        let s = SmaCrossoverStrategy;
        assert_eq!(s.evaluate(&ctx(&ind, &[], 90.0, 10.0)).unwrap(), Signal::Sell);
        assert_eq!(s.evaluate(&ctx(&ind, &[], 90.0, 0.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn sma_missing_value_holds() {
        let ind = FixedIndicators::default().with(SMA_FAST, 105.0);
        assert_eq!(
            SmaCrossoverStrategy.evaluate(&ctx(&ind, &[], 110.0, 0.0)).unwrap(),
            Signal::Hold
        );
    }

    #[test]
    fn provider_failure_propagates_as_error() {
        let ind = FixedIndicators {
            fail: true,
            ..Default::default()
        };
        assert!(SmaCrossoverStrategy.evaluate(&ctx(&ind, &[], 110.0, 0.0)).is_err());
    }

    #[test]
    fn rsi_thresholds() {
        let s = RsiStrategy::default();
        let low = FixedIndicators::default().with(RSI, 25.0);
        let high = FixedIndicators::default().with(RSI, 75.0);
        let mid = FixedIndicators::default().with(RSI, 50.0);
        assert_eq!(s.evaluate(&ctx(&low, &[], 100.0, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(s.evaluate(&ctx(&high, &[], 100.0, 5.0)).unwrap(), Signal::Sell);
        assert_eq!(s.evaluate(&ctx(&mid, &[], 100.0, 0.0)).unwrap(), Signal::Hold);
        assert_eq!(s.evaluate(&ctx(&mid, &[], 100.0, 5.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn rsi_custom_thresholds() {
        let s = RsiStrategy {
            oversold: 20.0,
            overbought: 80.0,
        };
        let ind = FixedIndicators::default().with(RSI, 25.0);
        assert_eq!(s.evaluate(&ctx(&ind, &[], 100.0, 0.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn macd_cross() {
        let up = FixedIndicators::default().with(MACD, 1.2).with(MACD_SIGNAL, 0.8);
        let down = FixedIndicators::default().with(MACD, -0.5).with(MACD_SIGNAL, 0.1);
        assert_eq!(MacdStrategy.evaluate(&ctx(&up, &[], 100.0, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(MacdStrategy.evaluate(&ctx(&down, &[], 100.0, 3.0)).unwrap(), Signal::Sell);
    }

    #[test]
    fn bollinger_breakouts() {
        let ind = FixedIndicators::default().with(BB_UPPER, 110.0).with(BB_LOWER, 90.0);
        let s = BollingerBandsStrategy;
        assert_eq!(s.evaluate(&ctx(&ind, &[], 89.0, 0.0)).unwrap(), Signal::Buy);
        assert_eq!(s.evaluate(&ctx(&ind, &[], 111.0, 1.0)).unwrap(), Signal::Sell);
        assert_eq!(s.evaluate(&ctx(&ind, &[], 100.0, 0.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn momentum_needs_full_lookback() {
        let s = MomentumStrategy {
            lookback: 3,
            threshold: 0.05,
        };
        let hist = history(&[100.0, 120.0]);
        let ind = FixedIndicators::default();
        assert_eq!(s.evaluate(&ctx(&ind, &hist, 120.0, 0.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn momentum_buys_and_sells_on_threshold() {
        let s = MomentumStrategy {
            lookback: 3,
            threshold: 0.05,
        };
        let ind = FixedIndicators::default();

        let rising = history(&[100.0, 103.0, 110.0]);
        assert_eq!(s.evaluate(&ctx(&ind, &rising, 110.0, 0.0)).unwrap(), Signal::Buy);

        let falling = history(&[100.0, 97.0, 90.0]);
        assert_eq!(s.evaluate(&ctx(&ind, &falling, 90.0, 2.0)).unwrap(), Signal::Sell);

        let flat = history(&[100.0, 101.0, 102.0]);
        assert_eq!(s.evaluate(&ctx(&ind, &flat, 102.0, 0.0)).unwrap(), Signal::Hold);
    }

    #[test]
    fn momentum_prefers_provider_rate_of_change() {
        let s = MomentumStrategy {
            lookback: 20,
            threshold: 0.05,
        };
        // One point of in-window history; the provider supplies the return.
        let hist = history(&[110.0]);
        let up = FixedIndicators::default().with("roc_19", 0.08);
        assert_eq!(s.evaluate(&ctx(&up, &hist, 110.0, 0.0)).unwrap(), Signal::Buy);

        let down = FixedIndicators::default().with("roc_19", -0.08);
        assert_eq!(s.evaluate(&ctx(&down, &hist, 110.0, 3.0)).unwrap(), Signal::Sell);
    }

    #[test]
    fn momentum_propagates_lookup_failure() {
        let s = MomentumStrategy::default();
        let ind = FixedIndicators {
            fail: true,
            ..FixedIndicators::default()
        };
        assert!(s.evaluate(&ctx(&ind, &history(&[100.0]), 100.0, 0.0)).is_err());
    }
}
