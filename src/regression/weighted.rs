//! Year-weighted least squares with exponentially decaying cross-year weights.
//!
//! Every target year is fitted on the whole sample, with row weights
//! `r^|year(row) - year|` normalised to sum to one. Components for the rows of
//! a year come from that year's own fit, so the seasonal pattern can drift
//! slowly over time.

use super::design::{Block, DesignMatrix};
use super::ols::{wls, LeastSquares};
use super::summary::RegressionFit;
use crate::error::{Result, WsaError};
use crate::iter_maybe_parallel;
use chrono::{Datelike, NaiveDate};
use log::debug;
use nalgebra::DVector;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Default decay rate of cross-year weights.
pub const DEFAULT_DECAY_RATE: f64 = 0.8;

/// Per-year diagonal weights over all rows of a series.
#[derive(Debug, Clone)]
pub struct YearWeights {
    row_years: Vec<i32>,
    years: Vec<i32>,
    decay_rate: f64,
}

impl YearWeights {
    /// Build weights for `dates` with decay rate `r` in (0, 1).
    pub fn new(dates: &[NaiveDate], decay_rate: f64) -> Result<Self> {
        if !(decay_rate > 0.0 && decay_rate < 1.0) {
            return Err(WsaError::InvalidParameter(format!(
                "decay rate must lie in (0, 1), got {}",
                decay_rate
            )));
        }
        if dates.is_empty() {
            return Err(WsaError::EmptyData);
        }
        let row_years: Vec<i32> = dates.iter().map(|d| d.year()).collect();
        let mut years = row_years.clone();
        years.sort_unstable();
        years.dedup();

        Ok(Self {
            row_years,
            years,
            decay_rate,
        })
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn row_years(&self) -> &[i32] {
        &self.row_years
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Diagonal of the weight matrix for `year`, summing to one.
    pub fn for_year(&self, year: i32) -> DVector<f64> {
        let raw: Vec<f64> = self
            .row_years
            .iter()
            .map(|&ry| self.decay_rate.powi((ry - year).abs()))
            .collect();
        let total: f64 = raw.iter().sum();
        DVector::from_iterator(raw.len(), raw.into_iter().map(|w| w / total))
    }
}

/// Components reconstructed from the per-year fits.
#[derive(Debug, Clone)]
pub struct WeightedComponents {
    /// Harmonic block contribution, per row.
    pub seasonal: Vec<f64>,
    /// Holiday block contribution, when the design has holiday columns.
    pub holiday: Option<Vec<f64>>,
    /// Outlier block contribution, when the design has outlier columns.
    pub outlier: Option<Vec<f64>>,
    /// Year of the last fit.
    pub last_year: i32,
    /// Summary of the last year's fit.
    pub last_fit: RegressionFit,
}

impl WeightedComponents {
    /// Coefficients of the last year's fit.
    pub fn last_coefficients(&self) -> &[f64] {
        &self.last_fit.coefficients
    }
}

/// Run one weighted regression per year and rebuild the components.
///
/// Fails with [`WsaError::SingularDesign`] naming the year whose weighted
/// normal matrix cannot be inverted.
pub fn fit_year_weighted(
    y: &[f64],
    design: &DesignMatrix,
    weights: &YearWeights,
) -> Result<WeightedComponents> {
    let n = y.len();
    if design.nrows() != n {
        return Err(WsaError::DimensionMismatch {
            expected: n,
            got: design.nrows(),
        });
    }
    if weights.row_years().len() != n {
        return Err(WsaError::DimensionMismatch {
            expected: n,
            got: weights.row_years().len(),
        });
    }

    let y_vec = DVector::from_column_slice(y);
    let years = weights.years().to_vec();

    let fits: Vec<(i32, DVector<f64>, LeastSquares)> = iter_maybe_parallel!(years)
        .map(|year| -> Result<(i32, DVector<f64>, LeastSquares)> {
            let w = weights.for_year(year);
            let fit = wls(design.matrix(), &y_vec, &w).map_err(|e| match e {
                WsaError::SingularDesign { context } => {
                    WsaError::singular(format!("{} (year {})", context, year))
                }
                other => other,
            })?;
            Ok((year, w, fit))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut seasonal = vec![0.0; n];
    let mut holiday = design.has_holidays().then(|| vec![0.0; n]);
    let mut outlier = design.has_outliers().then(|| vec![0.0; n]);

    for (year, _, fit) in &fits {
        for row in (0..n).filter(|&r| weights.row_years()[r] == *year) {
            seasonal[row] = design.block_value(Block::Harmonic, &fit.coefficients, row);
            if let Some(h) = holiday.as_mut() {
                h[row] = design.block_value(Block::Holiday, &fit.coefficients, row);
            }
            if let Some(o) = outlier.as_mut() {
                o[row] = design.block_value(Block::Outlier, &fit.coefficients, row);
            }
        }
        debug!("weighted fit for {} done ({} columns)", year, design.ncols());
    }

    let (last_year, last_weights, last_ls) = fits.last().ok_or(WsaError::EmptyData)?;
    let last_fit = RegressionFit::from_least_squares(design.labels(), last_ls, Some(last_weights))?;

    Ok(WeightedComponents {
        seasonal,
        holiday,
        outlier,
        last_year: *last_year,
        last_fit,
    })
}
