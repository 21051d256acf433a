//! Mean-variance portfolio optimization.
//!
//! Statistics are estimated from daily simple returns and annualized with
//! 252 trading days. Weights are long-only, sum to one, and lie within
//! per-asset bounds.

pub mod sqp;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use self::sqp::{Objective, SqpSettings, dot, minimize};
use super::error::MarketsenseError;
use super::metrics::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use super::returns::{ExcludedTicker, ReturnMatrix};
use crate::ports::price_port::PriceSeriesProvider;

/// Extra calendar days fetched before the lookback so weekends and holidays
/// do not shrink the sample.
pub const LOOKBACK_BUFFER_DAYS: i64 = 100;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 252;
pub const MIN_UNIVERSE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    MaxSharpe,
    MinVariance,
}

impl OptimizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationMethod::MaxSharpe => "max_sharpe",
            OptimizationMethod::MinVariance => "min_variance",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMethod {
    type Err = MarketsenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max_sharpe" => Ok(OptimizationMethod::MaxSharpe),
            "min_variance" => Ok(OptimizationMethod::MinVariance),
            other => Err(MarketsenseError::invalid_parameter(
                "method",
                format!("unknown method '{}' (expected max_sharpe or min_variance)", other),
            )),
        }
    }
}

/// Per-asset weight bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightConstraints {
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for WeightConstraints {
    fn default() -> Self {
        WeightConstraints {
            min_weight: 0.0,
            max_weight: 1.0,
        }
    }
}

impl WeightConstraints {
    pub fn new(min_weight: f64, max_weight: f64) -> Result<Self, MarketsenseError> {
        if !(0.0..=1.0).contains(&min_weight) {
            return Err(MarketsenseError::invalid_parameter(
                "min_weight",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&max_weight) {
            return Err(MarketsenseError::invalid_parameter(
                "max_weight",
                "must be within [0, 1]",
            ));
        }
        if min_weight > max_weight {
            return Err(MarketsenseError::invalid_parameter(
                "min_weight",
                format!("{} exceeds max_weight {}", min_weight, max_weight),
            ));
        }
        Ok(WeightConstraints {
            min_weight,
            max_weight,
        })
    }

    /// Check that `n` assets admit a fully-invested portfolio.
    pub fn validate_for(&self, n: usize) -> Result<(), MarketsenseError> {
        let n = n as f64;
        if n * self.min_weight > 1.0 + 1e-12 || n * self.max_weight < 1.0 - 1e-12 {
            return Err(MarketsenseError::invalid_parameter(
                "weights",
                format!(
                    "bounds [{}, {}] cannot sum to 1 across {} assets",
                    self.min_weight, self.max_weight, n
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub weights: Vec<f64>,
    pub stats: PortfolioStats,
    pub success: bool,
    pub iterations: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierPoint {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedPortfolio {
    pub method: OptimizationMethod,
    pub tickers: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub risk_free_rate: f64,
    pub lookback_days: u32,
    pub as_of: NaiveDate,
    pub success: bool,
    pub iterations: usize,
    pub excluded: Vec<ExcludedTicker>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frontier: Vec<FrontierPoint>,
}

/// Annualized variance, 252 * w'Σw.
struct AnnualVariance<'a> {
    cov: &'a [Vec<f64>],
}

impl Objective for AnnualVariance<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        TRADING_DAYS_PER_YEAR * quad_form(self.cov, w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        mat_vec(self.cov, w)
            .into_iter()
            .map(|v| 2.0 * TRADING_DAYS_PER_YEAR * v)
            .collect()
    }
}

/// Negative annualized Sharpe ratio.
struct NegativeSharpe<'a> {
    mean: &'a [f64],
    cov: &'a [Vec<f64>],
    risk_free_rate: f64,
}

impl Objective for NegativeSharpe<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        -portfolio_stats(w, self.mean, self.cov, self.risk_free_rate).sharpe_ratio
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let ret = TRADING_DAYS_PER_YEAR * dot(self.mean, w);
        let vol = (TRADING_DAYS_PER_YEAR * quad_form(self.cov, w)).sqrt();
        if vol <= f64::EPSILON {
            return self.mean.iter().map(|m| -TRADING_DAYS_PER_YEAR * m).collect();
        }
        let cov_w = mat_vec(self.cov, w);
        let excess = ret - self.risk_free_rate;
        self.mean
            .iter()
            .zip(&cov_w)
            .map(|(m, cw)| {
                let d_ret = TRADING_DAYS_PER_YEAR * m;
                let d_vol = TRADING_DAYS_PER_YEAR * cw / vol;
                -(d_ret * vol - excess * d_vol) / (vol * vol)
            })
            .collect()
    }
}

fn quad_form(m: &[Vec<f64>], w: &[f64]) -> f64 {
    dot(w, &mat_vec(m, w))
}

fn mat_vec(m: &[Vec<f64>], w: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, w)).collect()
}

fn portfolio_stats(
    w: &[f64],
    mean: &[f64],
    cov: &[Vec<f64>],
    risk_free_rate: f64,
) -> PortfolioStats {
    let annual_return = TRADING_DAYS_PER_YEAR * dot(mean, w);
    let annual_volatility = quad_form(cov, w).max(0.0).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    let sharpe_ratio = if annual_volatility > 0.0 {
        (annual_return - risk_free_rate) / annual_volatility
    } else {
        0.0
    };
    PortfolioStats {
        annual_return,
        annual_volatility,
        sharpe_ratio,
    }
}

pub struct PortfolioOptimizer<'a> {
    prices: &'a dyn PriceSeriesProvider,
    risk_free_rate: f64,
    settings: SqpSettings,
}

impl<'a> PortfolioOptimizer<'a> {
    pub fn new(prices: &'a dyn PriceSeriesProvider, risk_free_rate: f64) -> Self {
        PortfolioOptimizer {
            prices,
            risk_free_rate,
            settings: SqpSettings::default(),
        }
    }

    pub fn with_default_rate(prices: &'a dyn PriceSeriesProvider) -> Self {
        Self::new(prices, DEFAULT_RISK_FREE_RATE)
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Fetch each ticker and align daily returns.
    ///
    /// Fetch failures, short series and repeated tickers end up in the
    /// matrix's exclusion list; they never fail the call. The first
    /// occurrence of a repeated ticker is kept.
    pub fn get_returns(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReturnMatrix {
        let mut series = Vec::with_capacity(tickers.len());
        let mut failed = Vec::new();
        let mut seen = HashSet::new();
        for ticker in tickers {
            if !seen.insert(ticker.as_str()) {
                debug!(ticker = %ticker, "duplicate ticker ignored");
                failed.push((ticker.clone(), "duplicate ticker".to_string()));
                continue;
            }
            match self.prices.get_prices(ticker, start, end) {
                Ok(s) => series.push(s),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "excluding ticker from return matrix");
                    failed.push((ticker.clone(), e.to_string()));
                }
            }
        }

        let mut matrix = ReturnMatrix::from_series(&series);
        for (ticker, reason) in failed {
            matrix.exclude(&ticker, reason);
        }
        matrix
    }

    pub fn calculate_portfolio_stats(
        &self,
        weights: &[f64],
        mean_returns: &[f64],
        cov_matrix: &[Vec<f64>],
    ) -> PortfolioStats {
        portfolio_stats(weights, mean_returns, cov_matrix, self.risk_free_rate)
    }

    pub fn max_sharpe_ratio(
        &self,
        mean_returns: &[f64],
        cov_matrix: &[Vec<f64>],
        constraints: &WeightConstraints,
    ) -> OptimizationOutcome {
        let objective = NegativeSharpe {
            mean: mean_returns,
            cov: cov_matrix,
            risk_free_rate: self.risk_free_rate,
        };
        self.solve(&objective, mean_returns, cov_matrix, constraints)
    }

    pub fn min_variance(
        &self,
        mean_returns: &[f64],
        cov_matrix: &[Vec<f64>],
        constraints: &WeightConstraints,
    ) -> OptimizationOutcome {
        let objective = AnnualVariance { cov: cov_matrix };
        self.solve(&objective, mean_returns, cov_matrix, constraints)
    }

    fn solve(
        &self,
        objective: &dyn Objective,
        mean_returns: &[f64],
        cov_matrix: &[Vec<f64>],
        constraints: &WeightConstraints,
    ) -> OptimizationOutcome {
        let n = mean_returns.len();
        let lower = vec![constraints.min_weight; n];
        let upper = vec![constraints.max_weight; n];
        let result = minimize(objective, &lower, &upper, &self.settings);
        if !result.success {
            warn!(
                iterations = result.iterations,
                reason = %result.message,
                "optimizer did not converge"
            );
        }
        let stats = self.calculate_portfolio_stats(&result.x, mean_returns, cov_matrix);
        OptimizationOutcome {
            weights: result.x,
            stats,
            success: result.success,
            iterations: result.iterations,
            message: result.message,
        }
    }

    /// Monte-Carlo sample of random fully-invested portfolios.
    ///
    /// This approximates the frontier cloud; it does not trace the exact
    /// boundary and ignores weight bounds. Reproducible for a seeded `rng`.
    pub fn efficient_frontier<R: Rng + ?Sized>(
        &self,
        mean_returns: &[f64],
        cov_matrix: &[Vec<f64>],
        num_portfolios: usize,
        rng: &mut R,
    ) -> Vec<FrontierPoint> {
        let n = mean_returns.len();
        (0..num_portfolios)
            .map(|_| {
                let raw: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
                let total: f64 = raw.iter().sum();
                let weights: Vec<f64> = if total > 0.0 {
                    raw.iter().map(|w| w / total).collect()
                } else {
                    vec![1.0 / n as f64; n]
                };
                let stats = self.calculate_portfolio_stats(&weights, mean_returns, cov_matrix);
                FrontierPoint {
                    expected_return: stats.annual_return,
                    volatility: stats.annual_volatility,
                    sharpe_ratio: stats.sharpe_ratio,
                    weights,
                }
            })
            .collect()
    }

    pub fn optimize(
        &self,
        tickers: &[String],
        lookback_days: u32,
        method: OptimizationMethod,
        constraints: &WeightConstraints,
        as_of: NaiveDate,
    ) -> Result<OptimizedPortfolio, MarketsenseError> {
        let no_frontier: Option<(usize, &mut rand::rngs::StdRng)> = None;
        self.optimize_inner(tickers, lookback_days, method, constraints, as_of, no_frontier)
    }

    /// Like [`optimize`](Self::optimize), also sampling `num_portfolios`
    /// random portfolios from the same return estimates.
    #[allow(clippy::too_many_arguments)]
    pub fn optimize_with_frontier<R: Rng + ?Sized>(
        &self,
        tickers: &[String],
        lookback_days: u32,
        method: OptimizationMethod,
        constraints: &WeightConstraints,
        as_of: NaiveDate,
        num_portfolios: usize,
        rng: &mut R,
    ) -> Result<OptimizedPortfolio, MarketsenseError> {
        self.optimize_inner(
            tickers,
            lookback_days,
            method,
            constraints,
            as_of,
            Some((num_portfolios, rng)),
        )
    }

    fn optimize_inner<R: Rng + ?Sized>(
        &self,
        tickers: &[String],
        lookback_days: u32,
        method: OptimizationMethod,
        constraints: &WeightConstraints,
        as_of: NaiveDate,
        frontier: Option<(usize, &mut R)>,
    ) -> Result<OptimizedPortfolio, MarketsenseError> {
        if lookback_days == 0 {
            return Err(MarketsenseError::invalid_parameter(
                "lookback_days",
                "must be positive",
            ));
        }
        let start = as_of - Duration::days(i64::from(lookback_days) + LOOKBACK_BUFFER_DAYS);
        let matrix = self.get_returns(tickers, start, as_of);

        if matrix.num_tickers() < MIN_UNIVERSE {
            return Err(MarketsenseError::InsufficientUniverse {
                available: matrix.num_tickers(),
                required: MIN_UNIVERSE,
                excluded: matrix.excluded().iter().map(|e| e.ticker.clone()).collect(),
            });
        }
        constraints.validate_for(matrix.num_tickers())?;

        let mean = matrix.mean_returns();
        let cov = matrix.covariance();

        let outcome = match method {
            OptimizationMethod::MaxSharpe => self.max_sharpe_ratio(&mean, &cov, constraints),
            OptimizationMethod::MinVariance => self.min_variance(&mean, &cov, constraints),
        };

        let frontier = match frontier {
            Some((count, rng)) => self.efficient_frontier(&mean, &cov, count, rng),
            None => Vec::new(),
        };

        info!(
            method = %method,
            tickers = matrix.num_tickers(),
            excluded = matrix.excluded().len(),
            success = outcome.success,
            "portfolio optimized"
        );

        Ok(OptimizedPortfolio {
            method,
            tickers: matrix.tickers().to_vec(),
            weights: matrix
                .tickers()
                .iter()
                .cloned()
                .zip(outcome.weights.iter().copied())
                .collect(),
            expected_return: outcome.stats.annual_return,
            volatility: outcome.stats.annual_volatility,
            sharpe_ratio: outcome.stats.sharpe_ratio,
            risk_free_rate: self.risk_free_rate,
            lookback_days,
            as_of,
            success: outcome.success,
            iterations: outcome.iterations,
            excluded: matrix.excluded().to_vec(),
            frontier,
        })
    }
}
