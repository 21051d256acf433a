//! CLI integration tests: parsed commands run end to end over CSV fixtures
//! in a temp directory, with JSON written to a file.

mod common;

use clap::Parser;
use common::*;
use marketsense::cli::{self, Cli};
use marketsense::domain::error::MarketsenseError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_data() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_price_csv(dir.path(), "005930", &noisy_walk(300, 11, 0.0008, 0.02));
    write_price_csv(dir.path(), "000660", &noisy_walk(300, 12, 0.0004, 0.015));
    write_price_csv(dir.path(), "035420", &noisy_walk(300, 13, 0.0001, 0.025));
    dir
}

fn execute(args: &[&str]) -> Result<(), MarketsenseError> {
    let mut argv = vec!["marketsense"];
    argv.extend_from_slice(args);
    cli::execute(Cli::try_parse_from(argv).unwrap())
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn s(path: &Path) -> String {
    path.display().to_string()
}

mod backtest_command {
    use super::*;

    #[test]
    fn buy_and_hold_writes_result_json() {
        let data = setup_data();
        let out = data.path().join("bh.json");

        execute(&[
            "backtest",
            "--ticker",
            "005930",
            "--data-dir",
            &s(data.path()),
            "--start",
            "2024-01-01",
            "--end",
            "2024-06-30",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        assert_eq!(v["strategy_name"], "Buy & Hold (005930)");
        assert_eq!(v["start_date"], "2024-01-01");
        assert_eq!(v["num_trades"], 1);
        assert_eq!(v["portfolio_value_series"].as_array().unwrap().len(), 182);
        assert!(v["max_drawdown"].as_f64().unwrap() <= 0.0);
    }

    #[test]
    fn named_strategy_with_benchmark_and_capital() {
        let data = setup_data();
        let out = data.path().join("rsi.json");

        execute(&[
            "backtest",
            "--ticker",
            "005930",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-10-26",
            "--months",
            "6",
            "--strategy",
            "rsi",
            "--benchmark",
            "000660",
            "--capital",
            "5000000",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        assert_eq!(v["strategy_name"], "rsi");
        assert_eq!(v["initial_capital"], 5_000_000.0);
        assert!(v["benchmark_return"].is_number());
        assert!(v["alpha"].is_number());
    }

    #[test]
    fn compare_strategies_writes_ranked_results() {
        let data = setup_data();
        let out = data.path().join("cmp.json");

        execute(&[
            "backtest",
            "--ticker",
            "000660",
            "--data-dir",
            &s(data.path()),
            "--start",
            "2024-03-01",
            "--end",
            "2024-10-26",
            "--compare-strategies",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        let results = v["results"].as_array().unwrap();
        assert_eq!(results.len(), 7);
        let returns: Vec<f64> = results
            .iter()
            .map(|r| r["total_return"].as_f64().unwrap())
            .collect();
        assert!(returns.windows(2).all(|w| w[0] >= w[1]));
        assert!(v["best_sharpe"].is_string());
    }

    #[test]
    fn benchmark_reaches_every_compared_run() {
        let data = setup_data();
        let out = data.path().join("cmp_bench.json");

        execute(&[
            "backtest",
            "--ticker",
            "000660",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-10-26",
            "--months",
            "6",
            "--compare-strategies",
            "--benchmark",
            "005930",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        let results = v["results"].as_array().unwrap();
        assert_eq!(results.len(), 7);
        for r in results {
            assert!(r["benchmark_return"].is_number());
            assert!(r["alpha"].is_number());
        }
    }

    #[test]
    fn buy_and_hold_reports_benchmark() {
        let data = setup_data();
        let out = data.path().join("bh_bench.json");

        execute(&[
            "backtest",
            "--ticker",
            "035420",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-10-26",
            "--benchmark",
            "000660",
            "--output",
            &s(&out),
        ])
        .unwrap();

        assert!(read_json(&out)["alpha"].is_number());
    }

    #[test]
    fn unknown_strategy_is_invalid_parameter() {
        let data = setup_data();
        let err = execute(&[
            "backtest",
            "--ticker",
            "005930",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-06-30",
            "--strategy",
            "moonshot",
        ])
        .unwrap_err();
        assert!(matches!(err, MarketsenseError::InvalidParameter { .. }));
    }

    #[test]
    fn missing_ticker_is_data_unavailable() {
        let data = setup_data();
        let err = execute(&[
            "backtest",
            "--ticker",
            "999999",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-06-30",
        ])
        .unwrap_err();
        assert!(matches!(err, MarketsenseError::DataUnavailable { .. }));
    }

    #[test]
    fn invalid_config_value_fails_before_running() {
        let data = setup_data();
        let ini = data.path().join("bad.ini");
        fs::write(&ini, "[backtest]\ncommission = -0.5\n").unwrap();

        let err = execute(&[
            "backtest",
            "--ticker",
            "005930",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-06-30",
            "--config",
            &s(&ini),
        ])
        .unwrap_err();
        assert!(matches!(err, MarketsenseError::ConfigInvalid { .. }));
    }

    #[test]
    fn config_supplies_price_dir() {
        let data = setup_data();
        let ini = data.path().join("marketsense.ini");
        fs::write(
            &ini,
            format!(
                "[data]\nprice_dir = {}\n\n[backtest]\ninitial_capital = 2000000\n",
                s(data.path())
            ),
        )
        .unwrap();
        let out = data.path().join("cfg.json");

        execute(&[
            "backtest",
            "--ticker",
            "035420",
            "--end",
            "2024-06-30",
            "--config",
            &s(&ini),
            "--output",
            &s(&out),
        ])
        .unwrap();

        assert_eq!(read_json(&out)["initial_capital"], 2_000_000.0);
    }
}

mod optimize_command {
    use super::*;

    #[test]
    fn min_variance_over_listed_tickers() {
        let data = setup_data();
        let out = data.path().join("pf.json");

        execute(&[
            "optimize",
            "--tickers",
            "005930,000660,035420",
            "--data-dir",
            &s(data.path()),
            "--method",
            "min_variance",
            "--lookback-days",
            "120",
            "--max-weight",
            "0.6",
            "--end",
            "2024-10-26",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        assert_eq!(v["method"], "min_variance");
        assert_eq!(v["lookback_days"], 120);
        let weights = v["weights"].as_object().unwrap();
        assert_eq!(weights.len(), 3);
        let total: f64 = weights.values().map(|w| w.as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(weights.values().all(|w| w.as_f64().unwrap() <= 0.6 + 1e-9));
    }

    #[test]
    fn defaults_to_every_ticker_in_data_dir() {
        let data = setup_data();
        let out = data.path().join("all.json");

        execute(&[
            "optimize",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-10-26",
            "--frontier",
            "10",
            "--seed",
            "3",
            "--output",
            &s(&out),
        ])
        .unwrap();

        let v = read_json(&out);
        assert_eq!(v["method"], "max_sharpe");
        assert_eq!(v["tickers"].as_array().unwrap().len(), 3);
        assert_eq!(v["frontier"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn single_ticker_is_insufficient_universe() {
        let data = setup_data();
        let err = execute(&[
            "optimize",
            "--tickers",
            "005930,999999",
            "--data-dir",
            &s(data.path()),
            "--end",
            "2024-10-26",
        ])
        .unwrap_err();
        assert!(matches!(err, MarketsenseError::InsufficientUniverse { .. }));
    }

    #[test]
    fn unknown_method_is_invalid_parameter() {
        let data = setup_data();
        let err = execute(&[
            "optimize",
            "--data-dir",
            &s(data.path()),
            "--method",
            "max_return",
        ])
        .unwrap_err();
        assert!(matches!(err, MarketsenseError::InvalidParameter { .. }));
    }
}
