//! CSV price files, one per ticker.
//!
//! `<dir>/<TICKER>.csv` with a header row containing at least `date`
//! (`YYYY-MM-DD`) and `close`. Other columns such as open/high/low/volume
//! are ignored.

use crate::domain::error::MarketsenseError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::price_port::PriceSeriesProvider;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    close: f64,
}

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// Tickers with a price file in the base directory, sorted.
    pub fn list_tickers(&self) -> Result<Vec<String>, MarketsenseError> {
        let mut tickers = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    tickers.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

impl PriceSeriesProvider for CsvPriceAdapter {
    fn get_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketsenseError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| {
            MarketsenseError::data_unavailable(
                ticker,
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for (line, row) in rdr.deserialize::<PriceRow>().enumerate() {
            let row = row.map_err(|e| {
                MarketsenseError::data_unavailable(ticker, format!("CSV parse error: {}", e))
            })?;
            let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|e| {
                MarketsenseError::data_unavailable(
                    ticker,
                    format!("invalid date '{}' on row {}: {}", row.date, line + 1, e),
                )
            })?;

            if date < start || date > end {
                continue;
            }
            points.push(PricePoint::new(date, row.close));
        }

        if points.is_empty() {
            return Err(MarketsenseError::data_unavailable(
                ticker,
                format!("no prices between {} and {}", start, end),
            ));
        }

        points.sort_by_key(|p| p.date);
        PriceSeries::new(ticker, points)
    }
}
