//! Additive outlier search.
//!
//! Outliers are single-date indicator regressors added to the harmonic
//! design by a forward stepwise search on studentized coefficients, followed
//! by backward elimination of indicators that are no longer significant
//! once the others are in the model.
//!
//! The forward search scores every remaining date in every round. Each score
//! needs the inverse cross-product of the design with that date's indicator
//! appended, which is obtained from the current inverse by a rank-one update
//! rather than a fresh factorisation.

use super::order::{select_order, InformationCriterion};
use crate::core::HolidayMatrix;
use crate::error::{Result, WsaError};
use crate::iter_maybe_parallel;
use crate::regression::{augment_inverse, ols, Block, DesignMatrix, HarmonicOrder};
use crate::utils::robust_scale;
use chrono::NaiveDate;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Default significance threshold for outlier t statistics.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.8;

/// Robust scales at or below this value are treated as a perfect fit.
const MIN_SCALE: f64 = 1e-12;

/// Configuration for the outlier search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlierSearchConfig {
    /// Minimum |t| for an outlier to enter and stay in the model.
    pub threshold: f64,
    /// Rows that are always outliers and never candidates.
    pub fixed_rows: Vec<usize>,
    /// Harmonic order to use; selected by AICc when `None`.
    pub order: Option<HarmonicOrder>,
    /// Upper bound on forward selections.
    pub max_outliers: Option<usize>,
}

impl Default for OutlierSearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OUTLIER_THRESHOLD,
            fixed_rows: Vec::new(),
            order: None,
            max_outliers: None,
        }
    }
}

impl OutlierSearchConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_fixed_rows(mut self, rows: Vec<usize>) -> Self {
        self.fixed_rows = rows;
        self
    }

    pub fn with_order(mut self, order: HarmonicOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_max_outliers(mut self, max: usize) -> Self {
        self.max_outliers = Some(max);
        self
    }
}

/// Outliers retained by a completed search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlierReport {
    /// Harmonic order the search ran with.
    pub order: HarmonicOrder,
    /// Rows of detected outliers, ascending. Fixed rows are not included.
    pub rows: Vec<usize>,
    /// Dates of detected outliers, ascending.
    pub dates: Vec<NaiveDate>,
    /// |t| of each detected outlier in the final model.
    pub t_values: Vec<f64>,
    /// Robust residual scale of the final model.
    pub scale: f64,
    /// Outliers accepted by the forward pass before elimination.
    pub forward_selected: usize,
}

impl OutlierReport {
    pub fn outlier_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_outlier(&self, row: usize) -> bool {
        self.rows.binary_search(&row).is_ok()
    }
}

/// Outcome of [`search_outliers`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutlierSearch {
    /// The selected harmonic order is (0, 0): the series has no seasonality
    /// to model and no search was run.
    NoSeasonality,
    /// The search ran; the report may hold zero outliers.
    Completed(OutlierReport),
}

impl OutlierSearch {
    pub fn is_degenerate(&self) -> bool {
        matches!(self, OutlierSearch::NoSeasonality)
    }

    pub fn report(&self) -> Option<&OutlierReport> {
        match self {
            OutlierSearch::Completed(report) => Some(report),
            OutlierSearch::NoSeasonality => None,
        }
    }
}

/// Design and inverse after a forward round.
#[derive(Debug, Clone)]
struct ForwardState {
    design: DesignMatrix,
    inverse: DMatrix<f64>,
    xty: DVector<f64>,
    pool: Vec<usize>,
    selected: Vec<usize>,
}

/// Search the detrended series `y` for additive outliers.
pub fn search_outliers(
    y: &[f64],
    dates: &[NaiveDate],
    holidays: Option<&HolidayMatrix>,
    config: &OutlierSearchConfig,
) -> Result<OutlierSearch> {
    let n = y.len();
    if dates.len() != n {
        return Err(WsaError::DimensionMismatch {
            expected: dates.len(),
            got: n,
        });
    }
    if n == 0 {
        return Err(WsaError::EmptyData);
    }
    if !(config.threshold.is_finite() && config.threshold > 0.0) {
        return Err(WsaError::InvalidParameter(format!(
            "outlier threshold must be positive, got {}",
            config.threshold
        )));
    }

    let mut fixed = config.fixed_rows.clone();
    fixed.sort_unstable();
    fixed.dedup();

    let order = match config.order {
        Some(order) => order,
        None => select_order(y, dates, holidays, &fixed)?.best(InformationCriterion::Aicc),
    };
    if order.is_none() {
        debug!("harmonic order (0, 0): no seasonality, outlier search skipped");
        return Ok(OutlierSearch::NoSeasonality);
    }

    let base = DesignMatrix::build(dates, order, holidays, &fixed)?;
    let y_vec = DVector::from_column_slice(y);
    let base_fit = ols(base.matrix(), &y_vec)?;
    let residuals: Vec<f64> = base_fit.residuals.iter().copied().collect();
    let scale = robust_scale(&residuals);
    debug!("outlier search with order {} and robust scale {:.6}", order, scale);

    if scale <= MIN_SCALE {
        return Ok(OutlierSearch::Completed(OutlierReport {
            order,
            rows: Vec::new(),
            dates: Vec::new(),
            t_values: Vec::new(),
            scale,
            forward_selected: 0,
        }));
    }

    let xty = base.matrix().tr_mul(&y_vec);
    let mut state = ForwardState {
        pool: (0..n).filter(|r| fixed.binary_search(r).is_err()).collect(),
        selected: Vec::new(),
        inverse: base_fit.normal_inverse,
        xty,
        design: base,
    };

    let cap = config.max_outliers.unwrap_or(usize::MAX);
    while state.selected.len() < cap {
        match forward_round(&state, y, dates, scale, config.threshold)? {
            Some(next) => state = next,
            None => break,
        }
    }
    let forward_selected = state.selected.len();

    let (design, selected, t_values, final_scale) = backward_eliminate(
        state.design,
        state.selected,
        fixed.len(),
        &y_vec,
        config.threshold,
        scale,
    )?;
    debug_assert_eq!(design.outlier_rows().len(), fixed.len() + selected.len());

    let mut pairs: Vec<(usize, f64)> = selected.into_iter().zip(t_values).collect();
    pairs.sort_by_key(|(row, _)| *row);
    let rows: Vec<usize> = pairs.iter().map(|(r, _)| *r).collect();

    Ok(OutlierSearch::Completed(OutlierReport {
        order,
        dates: rows.iter().map(|&r| dates[r]).collect(),
        t_values: pairs.iter().map(|(_, t)| *t).collect(),
        rows,
        scale: final_scale,
        forward_selected,
    }))
}

/// Score every candidate and add the most significant one, if any passes.
fn forward_round(
    state: &ForwardState,
    y: &[f64],
    dates: &[NaiveDate],
    scale: f64,
    threshold: f64,
) -> Result<Option<ForwardState>> {
    let n = y.len();
    let p = state.design.ncols();
    // The grown design must stay below n - 1 columns.
    if state.pool.is_empty() || p + 2 >= n {
        return Ok(None);
    }

    let xt = state.design.matrix().transpose();
    let scores: Vec<Option<(usize, f64)>> = iter_maybe_parallel!(state.pool.clone())
        .map(|row| -> Result<Option<(usize, f64)>> {
            let v = indicator(n, row);
            match augment_inverse(&state.inverse, &xt, &v) {
                Ok(augmented) => {
                    let t = new_column_t(&augmented, &state.xty, y[row], scale);
                    Ok(Some((row, t)))
                }
                Err(WsaError::CollinearCandidate) => {
                    trace!("candidate {} collinear with design, skipped", dates[row]);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    // Pool is ascending, so a strict comparison keeps the earliest row on ties.
    let mut best: Option<(usize, f64)> = None;
    for (row, t) in scores.into_iter().flatten() {
        if best.map_or(true, |(_, bt)| t > bt) {
            best = Some((row, t));
        }
    }

    let (row, t) = match best {
        Some(b) if b.1 >= threshold => b,
        _ => return Ok(None),
    };

    let inverse = augment_inverse(&state.inverse, &xt, &indicator(n, row))?;
    let design = state.design.with_outlier(row, dates[row])?;
    let xty = state.xty.clone().insert_row(p, y[row]);
    debug!("outlier added at {} (|t| = {:.3})", dates[row], t);

    let mut selected = state.selected.clone();
    selected.push(row);
    Ok(Some(ForwardState {
        design,
        inverse,
        xty,
        pool: state.pool.iter().copied().filter(|&r| r != row).collect(),
        selected,
    }))
}

/// |t| of the last coefficient given the augmented inverse and `Xᵀy`.
fn new_column_t(augmented: &DMatrix<f64>, xty: &DVector<f64>, y_row: f64, scale: f64) -> f64 {
    let p = xty.len();
    let last = augmented.row(p);
    let coefficient: f64 = (0..p).map(|j| last[j] * xty[j]).sum::<f64>() + last[p] * y_row;
    coefficient.abs() / (scale * augmented[(p, p)].sqrt())
}

fn indicator(n: usize, row: usize) -> DVector<f64> {
    let mut v = DVector::zeros(n);
    v[row] = 1.0;
    v
}

/// Drop the least significant selected outlier until all pass `threshold`.
///
/// Returns the final design, the surviving rows, their |t| values and the
/// robust scale of the final fit.
fn backward_eliminate(
    mut design: DesignMatrix,
    mut selected: Vec<usize>,
    fixed_count: usize,
    y: &DVector<f64>,
    threshold: f64,
    initial_scale: f64,
) -> Result<(DesignMatrix, Vec<usize>, Vec<f64>, f64)> {
    let mut scale = initial_scale;
    let max_rounds = selected.len();

    for _ in 0..=max_rounds {
        if selected.is_empty() {
            return Ok((design, selected, Vec::new(), scale));
        }

        let fit = ols(design.matrix(), y)?;
        let residuals: Vec<f64> = fit.residuals.iter().copied().collect();
        scale = robust_scale(&residuals);

        let offset = design.block(Block::Outlier).start + fixed_count;
        let t_values: Vec<f64> = (0..selected.len())
            .map(|i| {
                let col = offset + i;
                let se = scale * fit.normal_inverse[(col, col)].sqrt();
                if se > 0.0 {
                    fit.coefficients[col].abs() / se
                } else {
                    f64::INFINITY
                }
            })
            .collect();

        let (weakest, t_min) = t_values
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |acc, (i, t)| if t < acc.1 { (i, t) } else { acc });

        if t_min >= threshold {
            return Ok((design, selected, t_values, scale));
        }

        let row = selected.remove(weakest);
        design = design.without_outlier(fixed_count + weakest);
        debug!("outlier at row {} dropped (|t| = {:.3})", row, t_min);
    }

    Err(WsaError::ComputationError(
        "backward elimination did not terminate".into(),
    ))
}
