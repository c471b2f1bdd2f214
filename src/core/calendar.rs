//! Calendar positions and caller-supplied holiday regressors.

use crate::error::{Result, WsaError};
use chrono::{Datelike, Duration, NaiveDate};

/// Number of days in the calendar year of `date`.
pub fn days_in_year(date: NaiveDate) -> u32 {
    if NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Number of days in the calendar month of `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Position of `date` within its year, in (0, 1].
pub fn yearly_position(date: NaiveDate) -> f64 {
    date.ordinal() as f64 / days_in_year(date) as f64
}

/// Position of `date` within its month, in (0, 1].
pub fn monthly_position(date: NaiveDate) -> f64 {
    date.day() as f64 / days_in_month(date) as f64
}

/// Externally built holiday or trading-day regressors, row-aligned to a series.
///
/// Columns are stored as named vectors; the engine only needs the numbers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HolidayMatrix {
    labels: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl HolidayMatrix {
    /// Create a holiday matrix from named columns of equal length.
    pub fn new(labels: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if labels.len() != columns.len() {
            return Err(WsaError::DimensionMismatch {
                expected: columns.len(),
                got: labels.len(),
            });
        }
        if columns.is_empty() {
            return Err(WsaError::InvalidParameter(
                "holiday matrix needs at least one column".into(),
            ));
        }
        let rows = columns[0].len();
        for col in &columns {
            if col.len() != rows {
                return Err(WsaError::DimensionMismatch {
                    expected: rows,
                    got: col.len(),
                });
            }
            if col.iter().any(|v| !v.is_finite()) {
                return Err(WsaError::InvalidParameter(
                    "holiday regressors must be finite".into(),
                ));
            }
        }
        Ok(Self { labels, columns })
    }

    /// Build one indicator column per event list.
    ///
    /// A row is 1 when an event date falls within the seven days ending on
    /// the row's date, 0 otherwise.
    pub fn from_event_dates(
        dates: &[NaiveDate],
        events: &[(String, Vec<NaiveDate>)],
    ) -> Result<Self> {
        let mut labels = Vec::with_capacity(events.len());
        let mut columns = Vec::with_capacity(events.len());

        for (name, event_dates) in events {
            let column: Vec<f64> = dates
                .iter()
                .map(|&d| {
                    let week_start = d - Duration::days(6);
                    if event_dates.iter().any(|e| *e >= week_start && *e <= d) {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            labels.push(name.clone());
            columns.push(column);
        }

        Self::new(labels, columns)
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(|c| c.as_slice())
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Check that the matrix lines up with a series of `rows` observations.
    pub fn check_rows(&self, rows: usize) -> Result<()> {
        if self.nrows() != rows {
            return Err(WsaError::DimensionMismatch {
                expected: rows,
                got: self.nrows(),
            });
        }
        Ok(())
    }
}
