//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for marketsense.
#[derive(Debug, thiserror::Error)]
pub enum MarketsenseError {
    #[error("data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("insufficient universe: {available} tickers with data, need {required} (excluded: {})", .excluded.join(", "))]
    InsufficientUniverse {
        available: usize,
        required: usize,
        excluded: Vec<String>,
    },

    #[error("strategy {strategy} failed on {date}: {reason}")]
    StrategyEvaluation {
        strategy: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("indicator lookup {name} for {ticker} failed: {reason}")]
    IndicatorLookup {
        ticker: String,
        name: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MarketsenseError {
    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        MarketsenseError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        MarketsenseError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MarketsenseError> for std::process::ExitCode {
    fn from(err: &MarketsenseError) -> Self {
        let code: u8 = match err {
            MarketsenseError::Io(_) | MarketsenseError::Json(_) => 1,
            MarketsenseError::ConfigParse { .. }
            | MarketsenseError::ConfigInvalid { .. } => 2,
            MarketsenseError::InvalidParameter { .. } => 3,
            MarketsenseError::DataUnavailable { .. } => 5,
            MarketsenseError::InsufficientUniverse { .. } => 6,
            MarketsenseError::StrategyEvaluation { .. }
            | MarketsenseError::IndicatorLookup { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
