//! Backtest engine and event loop.
//!
//! A run walks one ticker's price series in ascending date order, asks a
//! strategy for a signal each day, applies fills to a cash/shares position and
//! records the marked-to-market portfolio value. Each step depends on the
//! previous step's position, so the loop is strictly sequential.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::MarketsenseError;
use super::execution::{ExecutionConfig, Fill, execute_buy, execute_sell};
use super::metrics::{DEFAULT_RISK_FREE_RATE, ValuePoint, calculate_metrics};
use super::position::{Position, Trade, TradeAction};
use super::price::PriceSeries;
use super::strategy::{Signal, Strategy, StrategyContext, StrategyKind};
use crate::ports::indicator_port::IndicatorProvider;
use crate::ports::price_port::PriceSeriesProvider;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000_000.0;
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    initial_capital: f64,
    risk_free_rate: f64,
    execution: ExecutionConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            execution: ExecutionConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn new(
        initial_capital: f64,
        risk_free_rate: f64,
        execution: ExecutionConfig,
    ) -> Result<Self, MarketsenseError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(MarketsenseError::invalid_parameter(
                "initial_capital",
                "must be positive",
            ));
        }
        if !risk_free_rate.is_finite() || risk_free_rate < 0.0 {
            return Err(MarketsenseError::invalid_parameter(
                "risk_free_rate",
                "must be non-negative",
            ));
        }
        Ok(BacktestConfig {
            initial_capital,
            risk_free_rate,
            execution,
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }
}

/// Outcome of one simulated run. Built once at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub num_trades: usize,
    pub portfolio_value_series: Vec<ValuePoint>,
    pub trade_ledger: Vec<Trade>,
    pub benchmark_return: Option<f64>,
    pub alpha: Option<f64>,
}

pub struct BacktestEngine<'a> {
    prices: &'a dyn PriceSeriesProvider,
    indicators: &'a dyn IndicatorProvider,
    config: BacktestConfig,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(
        prices: &'a dyn PriceSeriesProvider,
        indicators: &'a dyn IndicatorProvider,
        config: BacktestConfig,
    ) -> Self {
        BacktestEngine {
            prices,
            indicators,
            config,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketsenseError> {
        let series = self.prices.get_prices(ticker, start, end)?;
        if series.len() < MIN_PRICE_POINTS {
            return Err(MarketsenseError::data_unavailable(
                ticker,
                format!(
                    "{} price points between {} and {}, need {}",
                    series.len(),
                    start,
                    end,
                    MIN_PRICE_POINTS
                ),
            ));
        }
        Ok(series)
    }

    /// Spend all initial capital on the first close and hold to the end.
    ///
    /// The entry is frictionless: no commission or slippage is charged on
    /// the initial purchase.
    pub fn run_buy_hold(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BacktestResult, MarketsenseError> {
        self.buy_hold(ticker, start, end, None)
    }

    /// [`run_buy_hold`](Self::run_buy_hold) with benchmark return and alpha.
    pub fn run_buy_hold_with_benchmark(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        benchmark: &str,
    ) -> Result<BacktestResult, MarketsenseError> {
        let benchmark_returns = self.benchmark_returns(benchmark, start, end);
        self.buy_hold(ticker, start, end, benchmark_returns.as_deref())
    }

    fn buy_hold(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        benchmark_returns: Option<&[f64]>,
    ) -> Result<BacktestResult, MarketsenseError> {
        let series = self.fetch(ticker, start, end)?;
        let points = series.points();
        let entry = points[0];

        let shares = self.config.initial_capital / entry.close;
        let values: Vec<ValuePoint> = points
            .iter()
            .map(|p| ValuePoint {
                date: p.date,
                value: shares * p.close,
            })
            .collect();

        let trades = vec![Trade {
            date: entry.date,
            action: TradeAction::Buy,
            executed_price: entry.close,
            shares,
            notional_value: self.config.initial_capital,
        }];

        info!(ticker, %start, %end, "buy and hold complete");

        Ok(self.finish(
            format!("Buy & Hold ({})", ticker),
            ticker,
            start,
            end,
            values,
            trades,
            benchmark_returns,
        ))
    }

    /// Drive `strategy` over the ticker's price series.
    ///
    /// A strategy error on any single day is logged and treated as `Hold`;
    /// it never aborts the run.
    pub fn run_strategy(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        strategy: &dyn Strategy,
        benchmark: Option<&str>,
    ) -> Result<BacktestResult, MarketsenseError> {
        let benchmark_returns = benchmark.and_then(|b| self.benchmark_returns(b, start, end));
        self.simulate(ticker, start, end, strategy, benchmark_returns.as_deref())
    }

    fn simulate(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        strategy: &dyn Strategy,
        benchmark_returns: Option<&[f64]>,
    ) -> Result<BacktestResult, MarketsenseError> {
        let series = self.fetch(ticker, start, end)?;
        let points = series.points();
        let execution = &self.config.execution;

        let mut position = Position::new(self.config.initial_capital);
        let mut values: Vec<ValuePoint> = Vec::with_capacity(points.len());
        let mut trades: Vec<Trade> = Vec::new();

        for (i, point) in points.iter().enumerate() {
            let ctx = StrategyContext {
                ticker,
                date: point.date,
                price: point.close,
                cash: position.cash,
                shares: position.shares,
                indicators: self.indicators,
                history: &points[..=i],
            };

            let signal = match evaluate_day(strategy, &ctx) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(ticker, error = %e, "holding for the day");
                    Signal::Hold
                }
            };

            let (date, close) = (point.date, point.close);
            let fill = match signal {
                Signal::Buy => Some(execute_buy(&mut position, date, close, execution)),
                Signal::Sell => Some(execute_sell(&mut position, date, close, execution)),
                Signal::Hold => None,
            };

            match fill {
                Some(Fill::Filled(trade)) => {
                    debug!(
                        ticker,
                        date = %trade.date,
                        action = ?trade.action,
                        shares = trade.shares,
                        price = trade.executed_price,
                        "trade filled"
                    );
                    trades.push(trade);
                }
                Some(Fill::CostExceedsCash { cost, cash }) => {
                    debug!(
                        ticker,
                        date = %point.date,
                        cost,
                        cash,
                        "buy skipped, cost exceeds cash"
                    );
                }
                Some(Fill::NoCash) | Some(Fill::NoShares) | None => {}
            }

            values.push(ValuePoint {
                date: point.date,
                value: position.market_value(point.close),
            });
        }

        info!(
            ticker,
            strategy = strategy.name(),
            trades = trades.len(),
            "strategy backtest complete"
        );

        Ok(self.finish(
            strategy.name().to_string(),
            ticker,
            start,
            end,
            values,
            trades,
            benchmark_returns,
        ))
    }

    fn benchmark_returns(
        &self,
        benchmark: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<f64>> {
        match self.prices.get_prices(benchmark, start, end) {
            Ok(series) => Some(series.daily_returns().into_iter().map(|(_, r)| r).collect()),
            Err(e) => {
                warn!(benchmark, error = %e, "benchmark unavailable, continuing without it");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        strategy_name: String,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        values: Vec<ValuePoint>,
        trades: Vec<Trade>,
        benchmark_returns: Option<&[f64]>,
    ) -> BacktestResult {
        let metrics = calculate_metrics(
            &values,
            &trades,
            benchmark_returns,
            self.config.risk_free_rate,
        );

        BacktestResult {
            strategy_name,
            ticker: ticker.to_string(),
            start_date: start,
            end_date: end,
            initial_capital: self.config.initial_capital,
            final_value: metrics.final_value,
            total_return: metrics.total_return,
            annual_return: metrics.annual_return,
            volatility: metrics.volatility,
            sharpe_ratio: metrics.sharpe_ratio,
            max_drawdown: metrics.max_drawdown,
            win_rate: metrics.win_rate,
            num_trades: metrics.num_trades,
            portfolio_value_series: values,
            trade_ledger: trades,
            benchmark_return: metrics.benchmark_return,
            alpha: metrics.alpha,
        }
    }

    /// Buy-and-hold plus every registered strategy, ranked by total return.
    ///
    /// The buy-and-hold baseline must succeed; a failing strategy run is
    /// logged and left out of the ranking. The benchmark, if any, is fetched
    /// once and applied to every run.
    pub fn compare_strategies(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        benchmark: Option<&str>,
    ) -> Result<Vec<BacktestResult>, MarketsenseError> {
        let benchmark_returns = benchmark.and_then(|b| self.benchmark_returns(b, start, end));
        let benchmark_returns = benchmark_returns.as_deref();
        let mut results = vec![self.buy_hold(ticker, start, end, benchmark_returns)?];

        for kind in StrategyKind::ALL {
            let strategy = kind.build();
            match self.simulate(ticker, start, end, strategy.as_ref(), benchmark_returns) {
                Ok(result) => results.push(result),
                Err(e) => warn!(ticker, strategy = %kind, error = %e, "strategy run failed"),
            }
        }

        rank_by_total_return(&mut results);
        Ok(results)
    }
}

/// One day's signal; any failure becomes a `StrategyEvaluation` error.
fn evaluate_day(
    strategy: &dyn Strategy,
    ctx: &StrategyContext<'_>,
) -> Result<Signal, MarketsenseError> {
    strategy
        .evaluate(ctx)
        .map_err(|e| MarketsenseError::StrategyEvaluation {
            strategy: strategy.name().to_string(),
            date: ctx.date,
            reason: e.to_string(),
        })
}

/// Sort descending by total return.
pub fn rank_by_total_return(results: &mut [BacktestResult]) {
    results.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
}

/// The result with the highest Sharpe ratio.
pub fn best_by_sharpe(results: &[BacktestResult]) -> Option<&BacktestResult> {
    results
        .iter()
        .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
}
