//! Dates × tickers matrix of daily simple returns.
//!
//! Columns are aligned on the union of return dates. A cell is `None` when
//! that ticker has no return for the date; dates are only dropped globally
//! through [`ReturnMatrix::common_only`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::metrics::mean;
use super::price::PriceSeries;

/// Minimum price points for a ticker to contribute a return column.
pub const MIN_USABLE_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedTicker {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnMatrix {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<Option<f64>>>,
    excluded: Vec<ExcludedTicker>,
}

impl ReturnMatrix {
    /// Align each usable series on the union of its return dates.
    ///
    /// Series with fewer than [`MIN_USABLE_POINTS`] points are recorded in the
    /// exclusion list rather than dropped silently.
    pub fn from_series(series: &[PriceSeries]) -> Self {
        let mut excluded = Vec::new();
        let mut columns: Vec<(String, Vec<(NaiveDate, f64)>)> = Vec::new();

        for s in series {
            if s.len() < MIN_USABLE_POINTS {
                excluded.push(ExcludedTicker {
                    ticker: s.ticker().to_string(),
                    reason: format!("{} price points, need {}", s.len(), MIN_USABLE_POINTS),
                });
                continue;
            }
            columns.push((s.ticker().to_string(), s.daily_returns()));
        }

        let dates: Vec<NaiveDate> = columns
            .iter()
            .flat_map(|(_, r)| r.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut rows = vec![vec![None; columns.len()]; dates.len()];
        for (j, (_, returns)) in columns.iter().enumerate() {
            for (date, r) in returns {
                if let Ok(i) = dates.binary_search(date) {
                    rows[i][j] = Some(*r);
                }
            }
        }

        ReturnMatrix {
            tickers: columns.into_iter().map(|(t, _)| t).collect(),
            dates,
            rows,
            excluded,
        }
    }

    /// Record a ticker that never made it into the matrix.
    pub fn exclude(&mut self, ticker: &str, reason: impl Into<String>) {
        self.excluded.push(ExcludedTicker {
            ticker: ticker.to_string(),
            reason: reason.into(),
        });
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn excluded(&self) -> &[ExcludedTicker] {
        &self.excluded
    }

    pub fn num_tickers(&self) -> usize {
        self.tickers.len()
    }

    pub fn get(&self, date_idx: usize, ticker_idx: usize) -> Option<f64> {
        self.rows.get(date_idx)?.get(ticker_idx).copied().flatten()
    }

    pub fn column(&self, ticker_idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(ticker_idx).copied().flatten())
            .collect()
    }

    /// Dates on which every included ticker has a return.
    pub fn common_dates(&self) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(d, _)| *d)
            .collect()
    }

    /// Strict inner join: keep only the common dates.
    pub fn common_only(&self) -> ReturnMatrix {
        let (dates, rows): (Vec<_>, Vec<_>) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(d, row)| (*d, row.clone()))
            .unzip();
        ReturnMatrix {
            tickers: self.tickers.clone(),
            dates,
            rows,
            excluded: self.excluded.clone(),
        }
    }

    /// Per-ticker mean daily return over the dates that ticker has.
    pub fn mean_returns(&self) -> Vec<f64> {
        (0..self.num_tickers()).map(|j| mean(&self.column(j))).collect()
    }

    /// Pairwise sample covariance of daily returns.
    ///
    /// Each pair uses the dates both tickers have, divided by n - 1. A pair
    /// with fewer than two overlapping dates gets covariance 0.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        let n = self.num_tickers();
        let mut cov = vec![vec![0.0; n]; n];
        for a in 0..n {
            for b in a..n {
                let pairs: Vec<(f64, f64)> = self
                    .rows
                    .iter()
                    .filter_map(|row| Some((row[a]?, row[b]?)))
                    .collect();
                if pairs.len() < 2 {
                    warn!(
                        first = %self.tickers[a],
                        second = %self.tickers[b],
                        overlap = pairs.len(),
                        "not enough overlapping returns, covariance set to 0"
                    );
                    continue;
                }
                let count = pairs.len() as f64;
                let ma = pairs.iter().map(|p| p.0).sum::<f64>() / count;
                let mb = pairs.iter().map(|p| p.1).sum::<f64>() / count;
                let c = pairs.iter().map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / (count - 1.0);
                cov[a][b] = c;
                cov[b][a] = c;
            }
        }
        cov
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn make_series(ticker: &str, points: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(
            ticker,
            points.iter().map(|&(day, c)| PricePoint::new(d(day), c)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn short_series_is_excluded_with_reason() {
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 101.0)]),
            make_series("B", &[(1, 50.0)]),
        ]);
        assert_eq!(m.tickers(), &["A".to_string()]);
        assert_eq!(m.excluded().len(), 1);
        assert_eq!(m.excluded()[0].ticker, "B");
    }

    #[test]
    fn misaligned_dates_keep_union_with_gaps() {
        // A trades on 1,2,3,4; B skips day 3.
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 110.0), (3, 121.0), (4, 133.1)]),
            make_series("B", &[(1, 10.0), (2, 11.0), (4, 12.1)]),
        ]);
        assert_eq!(m.dates(), &[d(2), d(3), d(4)]);
        assert_eq!(m.get(1, 1), None);
        assert_relative_eq!(m.get(2, 1).unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(m.column(0).len(), 3);
        assert_eq!(m.column(1).len(), 2);
    }

    #[test]
    fn common_dates_is_strict_inner_join() {
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 110.0), (3, 121.0), (4, 133.1)]),
            make_series("B", &[(1, 10.0), (2, 11.0), (4, 12.1)]),
        ]);
        assert_eq!(m.common_dates(), vec![d(2), d(4)]);

        let inner = m.common_only();
        assert_eq!(inner.dates(), &[d(2), d(4)]);
        assert_eq!(inner.column(1).len(), 2);
        assert_eq!(inner.tickers(), m.tickers());
    }

    #[test]
    fn mean_is_per_column_over_present_values() {
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 110.0), (3, 99.0)]),
            make_series("B", &[(1, 10.0), (3, 12.0)]),
        ]);
        let means = m.mean_returns();
        assert_relative_eq!(means[0], (0.1 + (-0.1)) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(means[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn covariance_is_symmetric_sample_estimate() {
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 101.0), (3, 99.0), (4, 102.0)]),
            make_series("B", &[(1, 50.0), (2, 50.5), (3, 50.0), (4, 51.5)]),
        ]);
        let cov = m.covariance();
        assert_relative_eq!(cov[0][1], cov[1][0]);
        let a = m.column(0);
        let ma = mean(&a);
        let var_a = a.iter().map(|x| (x - ma).powi(2)).sum::<f64>() / (a.len() - 1) as f64;
        assert_relative_eq!(cov[0][0], var_a, epsilon = 1e-15);
        assert!(cov[0][1] > 0.0);
    }

    #[test]
    fn covariance_without_overlap_is_zero() {
        let m = ReturnMatrix::from_series(&[
            make_series("A", &[(1, 100.0), (2, 101.0), (3, 99.0)]),
            make_series("B", &[(5, 50.0), (6, 50.5), (7, 50.0)]),
        ]);
        assert_eq!(m.covariance()[0][1], 0.0);
    }

    #[test]
    fn manual_exclusion_is_recorded() {
        let mut m = ReturnMatrix::from_series(&[]);
        m.exclude("X", "unknown ticker");
        assert_eq!(m.excluded()[0].reason, "unknown ticker");
        assert_eq!(m.num_tickers(), 0);
    }
}
