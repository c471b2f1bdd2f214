//! Weekly series data structure.

use crate::error::{Result, WsaError};
use chrono::{Datelike, Duration, NaiveDate};

/// Spacing between consecutive observations, in days.
pub const WEEK_DAYS: i64 = 7;

/// A complete, regularly spaced weekly series.
///
/// Dates are unique, strictly increasing and exactly seven days apart, and
/// every value is finite. The series is immutable once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeeklySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl WeeklySeries {
    /// Create a series from parallel date and value vectors.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(WsaError::DimensionMismatch {
                expected: dates.len(),
                got: values.len(),
            });
        }
        if dates.is_empty() {
            return Err(WsaError::EmptyData);
        }

        for i in 1..dates.len() {
            let step = (dates[i] - dates[i - 1]).num_days();
            if step <= 0 {
                return Err(WsaError::TimestampError(format!(
                    "dates must be strictly increasing ({} follows {})",
                    dates[i],
                    dates[i - 1]
                )));
            }
            if step != WEEK_DAYS {
                return Err(WsaError::TimestampError(format!(
                    "dates must be spaced {} days apart, found {} days between {} and {}",
                    WEEK_DAYS,
                    step,
                    dates[i - 1],
                    dates[i]
                )));
            }
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(WsaError::InvalidParameter(format!(
                "non-finite value at {}",
                dates[pos]
            )));
        }

        Ok(Self { dates, values })
    }

    /// Create a series of weekly observations starting at `start`.
    pub fn from_start(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = (0..values.len())
            .map(|i| start + Duration::days(WEEK_DAYS * i as i64))
            .collect();
        Self::new(dates, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Calendar year of every observation.
    pub fn row_years(&self) -> Vec<i32> {
        self.dates.iter().map(|d| d.year()).collect()
    }

    /// Distinct calendar years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years = self.row_years();
        years.dedup();
        years
    }

    /// Row index of an observation date.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }
}
