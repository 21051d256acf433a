//! Composite technical score strategy.
//!
//! Four sub-signals are each scored in [-1, +1] and blended with fixed
//! weights. Weights of unavailable sub-signals drop out of the denominator,
//! so the composite stays in [-1, +1] whatever subset is present.

use crate::domain::error::MarketsenseError;

use super::technical::{BB_LOWER, BB_MIDDLE, BB_UPPER, MACD, MACD_SIGNAL, RSI, SMA_FAST, SMA_SLOW};
use super::{Signal, Strategy, StrategyContext};

pub const SMA_WEIGHT: f64 = 0.30;
pub const RSI_WEIGHT: f64 = 0.25;
pub const MACD_WEIGHT: f64 = 0.25;
pub const BOLLINGER_WEIGHT: f64 = 0.20;

/// Indicator values for one ticker/date; `None` marks an unavailable value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn fetch(ctx: &StrategyContext<'_>) -> Result<Self, MarketsenseError> {
        Ok(IndicatorSnapshot {
            sma_20: ctx.indicator(SMA_FAST)?,
            sma_50: ctx.indicator(SMA_SLOW)?,
            rsi: ctx.indicator(RSI)?,
            macd: ctx.indicator(MACD)?,
            macd_signal: ctx.indicator(MACD_SIGNAL)?,
            bb_upper: ctx.indicator(BB_UPPER)?,
            bb_middle: ctx.indicator(BB_MIDDLE)?,
            bb_lower: ctx.indicator(BB_LOWER)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == IndicatorSnapshot::default()
    }
}

fn sma_score(price: f64, sma_20: f64, sma_50: f64) -> f64 {
    if price > sma_20 && sma_20 > sma_50 {
        1.0
    } else if price > sma_20 {
        0.5
    } else if price < sma_20 && sma_20 < sma_50 {
        -1.0
    } else if price < sma_20 {
        -0.5
    } else {
        0.0
    }
}

fn rsi_score(rsi: f64) -> f64 {
    if rsi < 30.0 {
        1.0
    } else if rsi < 40.0 {
        0.5
    } else if rsi > 70.0 {
        -1.0
    } else if rsi > 60.0 {
        -0.5
    } else {
        0.0
    }
}

fn macd_score(macd: f64, signal: f64) -> f64 {
    if macd > signal && macd > 0.0 {
        1.0
    } else if macd > signal {
        0.5
    } else if macd < signal && macd < 0.0 {
        -1.0
    } else if macd < signal {
        -0.5
    } else {
        0.0
    }
}

fn bollinger_score(price: f64, upper: f64, middle: f64, lower: f64) -> f64 {
    if price < lower {
        1.0
    } else if price < middle {
        0.3
    } else if price > upper {
        -1.0
    } else if price > middle {
        -0.3
    } else {
        0.0
    }
}

/// Weighted composite in [-1, +1]; 0 when no sub-signal is available.
pub fn calculate_ai_score(price: f64, snapshot: &IndicatorSnapshot) -> f64 {
    let mut score = 0.0;
    let mut weight_sum = 0.0;

    if let (Some(sma_20), Some(sma_50)) = (snapshot.sma_20, snapshot.sma_50) {
        score += sma_score(price, sma_20, sma_50) * SMA_WEIGHT;
        weight_sum += SMA_WEIGHT;
    }

    if let Some(rsi) = snapshot.rsi {
        score += rsi_score(rsi) * RSI_WEIGHT;
        weight_sum += RSI_WEIGHT;
    }

    if let (Some(macd), Some(signal)) = (snapshot.macd, snapshot.macd_signal) {
        score += macd_score(macd, signal) * MACD_WEIGHT;
        weight_sum += MACD_WEIGHT;
    }

    if let (Some(upper), Some(lower)) = (snapshot.bb_upper, snapshot.bb_lower) {
        let middle = snapshot.bb_middle.unwrap_or((upper + lower) / 2.0);
        score += bollinger_score(price, upper, middle, lower) * BOLLINGER_WEIGHT;
        weight_sum += BOLLINGER_WEIGHT;
    }

    if weight_sum > 0.0 {
        score /= weight_sum;
    }
    score.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct AiScoreStrategy {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for AiScoreStrategy {
    fn default() -> Self {
        AiScoreStrategy {
            buy_threshold: 0.4,
            sell_threshold: -0.4,
        }
    }
}

impl Strategy for AiScoreStrategy {
    fn name(&self) -> &str {
        "ai_score"
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Signal, MarketsenseError> {
        let snapshot = IndicatorSnapshot::fetch(ctx)?;
        if snapshot.is_empty() {
            return Ok(Signal::Hold);
        }

        let score = calculate_ai_score(ctx.price, &snapshot);
        if score >= self.buy_threshold && ctx.is_flat() {
            Ok(Signal::Buy)
        } else if score <= self.sell_threshold && ctx.is_long() {
            Ok(Signal::Sell)
        } else {
            Ok(Signal::Hold)
        }
    }
}
