//! INI file configuration adapter.

use crate::domain::error::MarketsenseError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MarketsenseError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| MarketsenseError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, MarketsenseError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| MarketsenseError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// No sections at all; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[backtest]
initial_capital = 10000000
commission = 0.0015
slippage = 0.0005

[optimizer]
lookback_days = 120
max_weight = 0.3

[data]
price_dir = /srv/prices
"#;

    #[test]
    fn reads_every_section() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("backtest", "commission", 0.0), 0.0015);
        assert_eq!(adapter.get_int("optimizer", "lookback_days", 252), 120);
        assert_eq!(
            adapter.get_string("data", "price_dir"),
            Some("/srv/prices".to_string())
        );
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("nowhere", "key"), None);
        assert_eq!(adapter.get_int("optimizer", "missing", 42), 42);
        assert_eq!(adapter.get_double("optimizer", "min_weight", 0.05), 0.05);
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter =
            FileConfigAdapter::from_string("[optimizer]\nlookback_days = soon\nmax_weight = lots\n")
                .unwrap();
        assert_eq!(adapter.get_int("optimizer", "lookback_days", 252), 252);
        assert_eq!(adapter.get_double("optimizer", "max_weight", 1.0), 1.0);
    }

    #[test]
    fn empty_config_has_no_values() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("backtest", "initial_capital"), None);
        assert_eq!(adapter.get_double("backtest", "initial_capital", 5.0), 5.0);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_double("optimizer", "max_weight", 1.0), 0.3);
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/marketsense.ini");
        assert!(matches!(result, Err(MarketsenseError::ConfigParse { .. })));
    }
}
