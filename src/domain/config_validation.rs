//! Configuration validation.
//!
//! Reads every known key through [`ConfigPort`], checks it, and builds the
//! domain configuration. Absent keys take their defaults; a present value
//! that does not parse or is out of range is `ConfigInvalid`.

use std::path::PathBuf;

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL};
use crate::domain::error::MarketsenseError;
use crate::domain::execution::{
    DEFAULT_BUY_CASH_FRACTION, DEFAULT_COMMISSION, DEFAULT_SLIPPAGE, ExecutionConfig,
};
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::optimizer::{DEFAULT_LOOKBACK_DAYS, WeightConstraints};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_PRICE_DIR: &str = "data/prices";
pub const DEFAULT_INDICATOR_WARMUP_DAYS: i64 = 400;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub risk_free_rate: f64,
    pub lookback_days: u32,
    pub constraints: WeightConstraints,
    pub frontier_portfolios: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub price_dir: PathBuf,
    pub indicator_warmup_days: i64,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> MarketsenseError {
    MarketsenseError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, MarketsenseError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{}' is not a number", raw))),
    }
}

fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, MarketsenseError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("'{}' is not an integer", raw))),
    }
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<f64, MarketsenseError> {
    if value < 0.0 {
        return Err(invalid(section, key, format!("{} must be non-negative", key)));
    }
    Ok(value)
}

fn risk_free_rate(config: &dyn ConfigPort, section: &str) -> Result<f64, MarketsenseError> {
    let value = read_f64(config, section, "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            section,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(value)
}

pub fn validate_backtest_config(
    config: &dyn ConfigPort,
) -> Result<BacktestConfig, MarketsenseError> {
    let initial_capital = read_f64(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let commission = non_negative(
        "backtest",
        "commission",
        read_f64(config, "backtest", "commission", DEFAULT_COMMISSION)?,
    )?;
    let slippage = non_negative(
        "backtest",
        "slippage",
        read_f64(config, "backtest", "slippage", DEFAULT_SLIPPAGE)?,
    )?;

    let fraction = read_f64(
        config,
        "backtest",
        "buy_cash_fraction",
        DEFAULT_BUY_CASH_FRACTION,
    )?;
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(invalid(
            "backtest",
            "buy_cash_fraction",
            "buy_cash_fraction must be in (0, 1]",
        ));
    }

    let rate = risk_free_rate(config, "backtest")?;
    let execution = ExecutionConfig::new(commission, slippage, fraction)?;
    BacktestConfig::new(initial_capital, rate, execution)
}

pub fn validate_optimizer_config(
    config: &dyn ConfigPort,
) -> Result<OptimizerSettings, MarketsenseError> {
    let rate = risk_free_rate(config, "optimizer")?;

    let lookback = read_i64(
        config,
        "optimizer",
        "lookback_days",
        i64::from(DEFAULT_LOOKBACK_DAYS),
    )?;
    let lookback_days = u32::try_from(lookback)
        .ok()
        .filter(|&d| d > 0)
        .ok_or_else(|| invalid("optimizer", "lookback_days", "lookback_days must be positive"))?;

    let min_weight = read_f64(config, "optimizer", "min_weight", 0.0)?;
    let max_weight = read_f64(config, "optimizer", "max_weight", 1.0)?;
    for (key, value) in [("min_weight", min_weight), ("max_weight", max_weight)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid("optimizer", key, format!("{} must be within [0, 1]", key)));
        }
    }
    if min_weight > max_weight {
        return Err(invalid(
            "optimizer",
            "min_weight",
            "min_weight must not exceed max_weight",
        ));
    }

    let frontier = read_i64(config, "optimizer", "frontier_portfolios", 0)?;
    let frontier_portfolios = usize::try_from(frontier).map_err(|_| {
        invalid(
            "optimizer",
            "frontier_portfolios",
            "frontier_portfolios must be non-negative",
        )
    })?;

    Ok(OptimizerSettings {
        risk_free_rate: rate,
        lookback_days,
        constraints: WeightConstraints::new(min_weight, max_weight)?,
        frontier_portfolios,
    })
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<DataSettings, MarketsenseError> {
    let price_dir = match config.get_string("data", "price_dir") {
        Some(dir) if dir.trim().is_empty() => {
            return Err(invalid("data", "price_dir", "price_dir must not be empty"));
        }
        Some(dir) => PathBuf::from(dir.trim()),
        None => PathBuf::from(DEFAULT_PRICE_DIR),
    };

    let warmup = read_i64(
        config,
        "data",
        "indicator_warmup_days",
        DEFAULT_INDICATOR_WARMUP_DAYS,
    )?;
    if warmup < 0 {
        return Err(invalid(
            "data",
            "indicator_warmup_days",
            "indicator_warmup_days must be non-negative",
        ));
    }

    Ok(DataSettings {
        price_dir,
        indicator_warmup_days: warmup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: MarketsenseError) -> String {
        match err {
            MarketsenseError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("");
        let bt = validate_backtest_config(&config).unwrap();
        assert_eq!(bt.initial_capital(), DEFAULT_INITIAL_CAPITAL);
        assert_eq!(bt.execution().commission(), DEFAULT_COMMISSION);
        assert_eq!(bt.execution().buy_cash_fraction(), DEFAULT_BUY_CASH_FRACTION);

        let opt = validate_optimizer_config(&config).unwrap();
        assert_eq!(opt.lookback_days, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(opt.constraints, WeightConstraints::default());
        assert_eq!(opt.frontier_portfolios, 0);

        let data = validate_data_config(&config).unwrap();
        assert_eq!(data.price_dir, PathBuf::from(DEFAULT_PRICE_DIR));
        assert_eq!(data.indicator_warmup_days, DEFAULT_INDICATOR_WARMUP_DAYS);
    }

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(
            "[backtest]\ninitial_capital = 5000000\ncommission = 0.001\nslippage = 0\n\
             buy_cash_fraction = 1.0\nrisk_free_rate = 0.03\n",
        );
        let bt = validate_backtest_config(&config).unwrap();
        assert_eq!(bt.initial_capital(), 5_000_000.0);
        assert_eq!(bt.execution().slippage(), 0.0);
        assert_eq!(bt.risk_free_rate(), 0.03);
    }

    #[test]
    fn initial_capital_zero_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\ninitial_capital = 0\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "initial_capital");
    }

    #[test]
    fn negative_commission_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\ncommission = -0.01\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "commission");
    }

    #[test]
    fn negative_slippage_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\nslippage = -1\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "slippage");
    }

    #[test]
    fn non_numeric_value_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\ncommission = cheap\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "commission");
    }

    #[test]
    fn cash_fraction_out_of_range_fails() {
        for raw in ["0", "1.5"] {
            let cfg = make_config(&format!("[backtest]\nbuy_cash_fraction = {}\n", raw));
            assert_eq!(
                invalid_key(validate_backtest_config(&cfg).unwrap_err()),
                "buy_cash_fraction"
            );
        }
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let err = validate_optimizer_config(&make_config("[optimizer]\nrisk_free_rate = 1.2\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "risk_free_rate");
    }

    #[test]
    fn weight_bounds_checked() {
        let err = validate_optimizer_config(&make_config(
            "[optimizer]\nmin_weight = 0.4\nmax_weight = 0.2\n",
        ))
        .unwrap_err();
        assert_eq!(invalid_key(err), "min_weight");

        let err = validate_optimizer_config(&make_config("[optimizer]\nmax_weight = 2\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "max_weight");
    }

    #[test]
    fn lookback_must_be_positive() {
        let err = validate_optimizer_config(&make_config("[optimizer]\nlookback_days = 0\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "lookback_days");
    }

    #[test]
    fn frontier_must_be_non_negative() {
        let err =
            validate_optimizer_config(&make_config("[optimizer]\nfrontier_portfolios = -5\n"))
                .unwrap_err();
        assert_eq!(invalid_key(err), "frontier_portfolios");
    }

    #[test]
    fn data_section_parsed() {
        let data = validate_data_config(&make_config(
            "[data]\nprice_dir = /srv/krx\nindicator_warmup_days = 250\n",
        ))
        .unwrap();
        assert_eq!(data.price_dir, PathBuf::from("/srv/krx"));
        assert_eq!(data.indicator_warmup_days, 250);
    }

    #[test]
    fn negative_warmup_fails() {
        let err = validate_data_config(&make_config("[data]\nindicator_warmup_days = -1\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "indicator_warmup_days");
    }
}
