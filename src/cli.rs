//! CLI definition and dispatch.

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use crate::adapters::computed_indicators::ComputedIndicatorAdapter;
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult, best_by_sharpe};
use crate::domain::config_validation::{
    DataSettings, validate_backtest_config, validate_data_config, validate_optimizer_config,
};
use crate::domain::error::MarketsenseError;
use crate::domain::optimizer::{
    OptimizationMethod, OptimizedPortfolio, PortfolioOptimizer, WeightConstraints,
};
use crate::domain::strategy::StrategyKind;
use crate::ports::report_port::ReportPort;

pub const DAYS_PER_YEAR: i64 = 365;
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "marketsense",
    about = "Backtesting and portfolio optimization for Korean equities"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one ticker with buy-and-hold or a registered strategy
    Backtest {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of <TICKER>.csv price files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// Defaults to today
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        /// Window length ending at --end when --start is absent
        #[arg(long)]
        years: Option<u32>,
        #[arg(long)]
        months: Option<u32>,
        /// Strategy name; buy-and-hold when omitted
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        benchmark: Option<String>,
        #[arg(long)]
        capital: Option<f64>,
        /// Run buy-and-hold and every registered strategy, ranked
        #[arg(long)]
        compare_strategies: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Optimize portfolio weights over a ticker universe
    Optimize {
        /// Comma-separated tickers; every ticker in the data directory when omitted
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// max_sharpe or min_variance
        #[arg(short, long, default_value = "max_sharpe")]
        method: String,
        #[arg(long)]
        lookback_days: Option<u32>,
        #[arg(long)]
        min_weight: Option<f64>,
        #[arg(long)]
        max_weight: Option<f64>,
        /// As-of date, defaults to today
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        /// Number of random portfolios to sample for the efficient frontier
        #[arg(long)]
        frontier: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatch a parsed command.
pub fn execute(cli: Cli) -> Result<(), MarketsenseError> {
    match cli.command {
        Command::Backtest {
            ticker,
            config,
            data_dir,
            start,
            end,
            years,
            months,
            strategy,
            benchmark,
            capital,
            compare_strategies,
            output,
        } => resolve_window(start, end, years, months).and_then(|(start, end)| {
            run_backtest(&BacktestArgs {
                ticker,
                config,
                data_dir,
                start,
                end,
                strategy,
                benchmark,
                capital,
                compare_strategies,
                output,
            })
        }),
        Command::Optimize {
            tickers,
            config,
            data_dir,
            method,
            lookback_days,
            min_weight,
            max_weight,
            end,
            frontier,
            seed,
            output,
        } => run_optimize(&OptimizeArgs {
            tickers,
            config,
            data_dir,
            method,
            lookback_days,
            min_weight,
            max_weight,
            as_of: end.unwrap_or_else(today),
            frontier,
            seed,
            output,
        }),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve `--start/--end/--years/--months` into an inclusive date range.
///
/// An explicit start wins over a relative window; with neither, the window
/// is one year ending at `end` (today by default).
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    years: Option<u32>,
    months: Option<u32>,
) -> Result<(NaiveDate, NaiveDate), MarketsenseError> {
    let end = end.unwrap_or_else(today);
    let start = match start {
        Some(s) => s,
        None => {
            let days = match (years, months) {
                (None, None) => DAYS_PER_YEAR,
                (y, m) => {
                    i64::from(y.unwrap_or(0)) * DAYS_PER_YEAR
                        + i64::from(m.unwrap_or(0)) * DAYS_PER_MONTH
                }
            };
            if days <= 0 {
                return Err(MarketsenseError::invalid_parameter(
                    "window",
                    "--years/--months must describe a positive window",
                ));
            }
            end - Duration::days(days)
        }
    };
    if start >= end {
        return Err(MarketsenseError::invalid_parameter(
            "start",
            format!("start {} must be before end {}", start, end),
        ));
    }
    Ok((start, end))
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, MarketsenseError> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn price_adapter(data: &DataSettings, override_dir: Option<&PathBuf>) -> CsvPriceAdapter {
    let dir = override_dir.cloned().unwrap_or_else(|| data.price_dir.clone());
    CsvPriceAdapter::new(dir)
}

fn reporter(output: Option<&PathBuf>) -> JsonReportAdapter {
    match output {
        Some(path) => JsonReportAdapter::to_file(path.clone()),
        None => JsonReportAdapter::stdout(),
    }
}

struct BacktestArgs {
    ticker: String,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    start: NaiveDate,
    end: NaiveDate,
    strategy: Option<String>,
    benchmark: Option<String>,
    capital: Option<f64>,
    compare_strategies: bool,
    output: Option<PathBuf>,
}

fn run_backtest(args: &BacktestArgs) -> Result<(), MarketsenseError> {
    let config = load_config(args.config.as_ref())?;
    let mut bt_config = validate_backtest_config(&config)?;
    let data = validate_data_config(&config)?;

    if let Some(capital) = args.capital {
        bt_config = BacktestConfig::new(
            capital,
            bt_config.risk_free_rate(),
            bt_config.execution().clone(),
        )?;
    }

    let strategy = args
        .strategy
        .as_deref()
        .map(str::parse::<StrategyKind>)
        .transpose()?;

    let prices = price_adapter(&data, args.data_dir.as_ref());
    let indicators = ComputedIndicatorAdapter::new(&prices, data.indicator_warmup_days)
        .with_horizon(args.end);
    let engine = BacktestEngine::new(&prices, &indicators, bt_config);
    let report = reporter(args.output.as_ref());

    eprintln!(
        "Backtesting {} from {} to {}",
        args.ticker, args.start, args.end
    );

    if args.compare_strategies {
        let results = engine.compare_strategies(
            &args.ticker,
            args.start,
            args.end,
            args.benchmark.as_deref(),
        )?;
        eprint!("{}", format_ranking(&results));
        return report.write_comparison(&results);
    }

    let result = match strategy {
        Some(kind) => {
            let built = kind.build();
            engine.run_strategy(
                &args.ticker,
                args.start,
                args.end,
                built.as_ref(),
                args.benchmark.as_deref(),
            )?
        }
        None => match args.benchmark.as_deref() {
            Some(benchmark) => {
                engine.run_buy_hold_with_benchmark(&args.ticker, args.start, args.end, benchmark)?
            }
            None => engine.run_buy_hold(&args.ticker, args.start, args.end)?,
        },
    };

    eprint!("{}", format_summary(&result));
    report.write_backtest(&result)
}

struct OptimizeArgs {
    tickers: Vec<String>,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    method: String,
    lookback_days: Option<u32>,
    min_weight: Option<f64>,
    max_weight: Option<f64>,
    as_of: NaiveDate,
    frontier: Option<usize>,
    seed: Option<u64>,
    output: Option<PathBuf>,
}

fn run_optimize(args: &OptimizeArgs) -> Result<(), MarketsenseError> {
    let config = load_config(args.config.as_ref())?;
    let settings = validate_optimizer_config(&config)?;
    let data = validate_data_config(&config)?;

    let method: OptimizationMethod = args.method.parse()?;
    let constraints = WeightConstraints::new(
        args.min_weight.unwrap_or(settings.constraints.min_weight),
        args.max_weight.unwrap_or(settings.constraints.max_weight),
    )?;
    let lookback_days = args.lookback_days.unwrap_or(settings.lookback_days);
    let num_portfolios = args.frontier.unwrap_or(settings.frontier_portfolios);

    let prices = price_adapter(&data, args.data_dir.as_ref());
    let tickers = if args.tickers.is_empty() {
        prices.list_tickers()?
    } else {
        args.tickers.iter().map(|t| t.trim().to_string()).collect()
    };
    info!(tickers = tickers.len(), %method, lookback_days, "optimizing");

    let optimizer = PortfolioOptimizer::new(&prices, settings.risk_free_rate);
    let portfolio = if num_portfolios > 0 {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        optimizer.optimize_with_frontier(
            &tickers,
            lookback_days,
            method,
            &constraints,
            args.as_of,
            num_portfolios,
            &mut rng,
        )?
    } else {
        optimizer.optimize(&tickers, lookback_days, method, &constraints, args.as_of)?
    };

    eprint!("{}", format_portfolio(&portfolio));
    reporter(args.output.as_ref()).write_portfolio(&portfolio)
}

pub fn format_summary(result: &BacktestResult) -> String {
    let mut out = format!(
        "{} [{}] {} .. {}\n",
        result.strategy_name, result.ticker, result.start_date, result.end_date
    );
    out.push_str(&format!(
        "  final value   {:>16.0}  (initial {:.0})\n",
        result.final_value, result.initial_capital
    ));
    out.push_str(&format!("  total return  {:>15.2}%\n", result.total_return * 100.0));
    out.push_str(&format!("  annual return {:>15.2}%\n", result.annual_return * 100.0));
    out.push_str(&format!("  volatility    {:>15.2}%\n", result.volatility * 100.0));
    out.push_str(&format!("  sharpe        {:>16.2}\n", result.sharpe_ratio));
    out.push_str(&format!("  max drawdown  {:>15.2}%\n", result.max_drawdown * 100.0));
    out.push_str(&format!("  win rate      {:>15.2}%\n", result.win_rate * 100.0));
    out.push_str(&format!("  trades        {:>16}\n", result.num_trades));
    if let (Some(bench), Some(alpha)) = (result.benchmark_return, result.alpha) {
        out.push_str(&format!("  benchmark     {:>15.2}%\n", bench * 100.0));
        out.push_str(&format!("  alpha         {:>15.2}%\n", alpha * 100.0));
    }
    out
}

/// Ranked comparison table; `results` are expected in rank order.
pub fn format_ranking(results: &[BacktestResult]) -> String {
    let mut out = format!(
        "{:>4}  {:<28} {:>10} {:>10} {:>8} {:>10} {:>7}\n",
        "rank", "strategy", "return", "annual", "sharpe", "mdd", "trades"
    );
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<28} {:>9.2}% {:>9.2}% {:>8.2} {:>9.2}% {:>7}\n",
            i + 1,
            r.strategy_name,
            r.total_return * 100.0,
            r.annual_return * 100.0,
            r.sharpe_ratio,
            r.max_drawdown * 100.0,
            r.num_trades
        ));
    }
    if let Some(best) = best_by_sharpe(results) {
        out.push_str(&format!(
            "best sharpe: {} ({:.2})\n",
            best.strategy_name, best.sharpe_ratio
        ));
    }
    out
}

pub fn format_portfolio(portfolio: &OptimizedPortfolio) -> String {
    let mut out = format!(
        "{} portfolio as of {} ({} day lookback)\n",
        portfolio.method, portfolio.as_of, portfolio.lookback_days
    );
    for (ticker, weight) in &portfolio.weights {
        out.push_str(&format!("  {:<10} {:>7.2}%\n", ticker, weight * 100.0));
    }
    out.push_str(&format!(
        "  expected return {:.2}%  volatility {:.2}%  sharpe {:.2}\n",
        portfolio.expected_return * 100.0,
        portfolio.volatility * 100.0,
        portfolio.sharpe_ratio
    ));
    for excluded in &portfolio.excluded {
        out.push_str(&format!("  excluded {}: {}\n", excluded.ticker, excluded.reason));
    }
    if !portfolio.success {
        out.push_str(&format!(
            "  warning: solver did not converge after {} iterations\n",
            portfolio.iterations
        ));
    }
    out
}
