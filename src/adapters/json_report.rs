//! JSON report adapter implementing ReportPort.
//!
//! Pretty-printed JSON goes to a file when a path is configured, otherwise
//! to stdout.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::backtest::{BacktestResult, best_by_sharpe};
use crate::domain::error::MarketsenseError;
use crate::domain::optimizer::OptimizedPortfolio;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct ComparisonReport<'a> {
    best_sharpe: Option<&'a str>,
    results: &'a [BacktestResult],
}

pub struct JsonReportAdapter {
    output: Option<PathBuf>,
}

impl JsonReportAdapter {
    pub fn stdout() -> Self {
        Self { output: None }
    }

    pub fn to_file(path: PathBuf) -> Self {
        Self { output: Some(path) }
    }

    fn emit<T: Serialize>(&self, value: &T) -> Result<(), MarketsenseError> {
        let json = serde_json::to_string_pretty(value)?;
        match &self.output {
            Some(path) => fs::write(path, json + "\n")?,
            None => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", json)?;
            }
        }
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(&self, result: &BacktestResult) -> Result<(), MarketsenseError> {
        self.emit(result)
    }

    fn write_comparison(&self, results: &[BacktestResult]) -> Result<(), MarketsenseError> {
        self.emit(&ComparisonReport {
            best_sharpe: best_by_sharpe(results).map(|r| r.strategy_name.as_str()),
            results,
        })
    }

    fn write_portfolio(&self, portfolio: &OptimizedPortfolio) -> Result<(), MarketsenseError> {
        self.emit(portfolio)
    }
}
