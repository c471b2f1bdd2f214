//! Harmonic order selection by information criterion.
//!
//! Every order on the grid `k ∈ {0, 6, …, 36}`, `l ∈ {0, 6, 12}` is fitted by
//! ordinary least squares (no intercept) on the harmonic, holiday and outlier
//! design, and the order minimising each criterion is reported.

use crate::core::HolidayMatrix;
use crate::error::{Result, WsaError};
use crate::iter_maybe_parallel;
use crate::regression::{
    information_criteria, ols, DesignMatrix, HarmonicOrder, InformationCriteria,
};
use chrono::NaiveDate;
use log::{trace, warn};
use nalgebra::DVector;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use std::fmt;

/// Spacing between candidate orders on the grid.
pub const ORDER_STEP: usize = 6;
/// Number of yearly grid points (`k = 0, 6, …, 36`).
pub const YEARLY_GRID: usize = 7;
/// Number of monthly grid points (`l = 0, 6, 12`).
pub const MONTHLY_GRID: usize = 3;

/// Criterion used to pick the harmonic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InformationCriterion {
    /// Akaike information criterion.
    Aic,
    /// Small-sample corrected AIC.
    #[default]
    Aicc,
    /// Bayesian information criterion.
    Bic,
}

impl InformationCriterion {
    /// Value of this criterion in a set of criteria.
    pub fn value(&self, criteria: &InformationCriteria) -> f64 {
        match self {
            InformationCriterion::Aic => criteria.aic,
            InformationCriterion::Aicc => criteria.aicc,
            InformationCriterion::Bic => criteria.bic,
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InformationCriterion::Aic => "AIC",
            InformationCriterion::Aicc => "AICc",
            InformationCriterion::Bic => "BIC",
        };
        f.write_str(name)
    }
}

/// Criteria of one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderScore {
    pub order: HarmonicOrder,
    pub criteria: InformationCriteria,
}

/// Result of a grid search over harmonic orders.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderSelection {
    scores: Vec<OrderScore>,
    aic: HarmonicOrder,
    aicc: HarmonicOrder,
    bic: HarmonicOrder,
}

impl OrderSelection {
    /// Order minimising the given criterion.
    pub fn best(&self, criterion: InformationCriterion) -> HarmonicOrder {
        match criterion {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Aicc => self.aicc,
            InformationCriterion::Bic => self.bic,
        }
    }

    /// All evaluated grid points, yearly index outer, monthly inner.
    pub fn scores(&self) -> &[OrderScore] {
        &self.scores
    }

    /// Criteria of a specific order, if it is on the grid.
    pub fn score(&self, order: HarmonicOrder) -> Option<&OrderScore> {
        self.scores.iter().find(|s| s.order == order)
    }
}

/// The 21 candidate orders, yearly index outer, monthly inner.
pub fn order_grid() -> Vec<HarmonicOrder> {
    (0..YEARLY_GRID)
        .flat_map(|i| {
            (0..MONTHLY_GRID).map(move |j| HarmonicOrder::new(i * ORDER_STEP, j * ORDER_STEP))
        })
        .collect()
}

/// Evaluate every grid order on the detrended series `y`.
///
/// `holidays` and `outlier_rows` are included as fixed regressors in every
/// fit. Orders whose harmonic columns make the design singular score `+∞`
/// and are never selected. A singular fixed part fails every order, so it is
/// reported as [`WsaError::SingularDesign`] instead.
pub fn select_order(
    y: &[f64],
    dates: &[NaiveDate],
    holidays: Option<&HolidayMatrix>,
    outlier_rows: &[usize],
) -> Result<OrderSelection> {
    if y.len() != dates.len() {
        return Err(WsaError::DimensionMismatch {
            expected: dates.len(),
            got: y.len(),
        });
    }
    if y.is_empty() {
        return Err(WsaError::EmptyData);
    }
    if let Some(h) = holidays {
        h.check_rows(y.len())?;
    }

    let y_vec = DVector::from_column_slice(y);
    let fixed = DesignMatrix::build(dates, HarmonicOrder::NONE, holidays, outlier_rows)?;
    if fixed.ncols() > 0 {
        ols(fixed.matrix(), &y_vec).map_err(|e| match e {
            WsaError::SingularDesign { context } => WsaError::SingularDesign {
                context: format!("holiday and outlier regressors: {}", context),
            },
            other => other,
        })?;
    }

    let evaluated: Vec<(OrderScore, bool)> = iter_maybe_parallel!(order_grid())
        .map(|order| -> Result<(OrderScore, bool)> {
            let design = DesignMatrix::build(dates, order, holidays, outlier_rows)?;
            let (criteria, singular) = match ols(design.matrix(), &y_vec) {
                Ok(fit) => (information_criteria(fit.rss, fit.nobs(), fit.ncoef()), false),
                Err(WsaError::SingularDesign { context }) => {
                    warn!("order {} skipped: {}", order, context);
                    (InformationCriteria::UNFIT, true)
                }
                Err(e) => return Err(e),
            };
            trace!(
                "order {}: aic={:.3} aicc={:.3} bic={:.3}",
                order,
                criteria.aic,
                criteria.aicc,
                criteria.bic
            );
            Ok((OrderScore { order, criteria }, singular))
        })
        .collect::<Result<Vec<_>>>()?;

    if evaluated.iter().all(|(_, singular)| *singular) {
        return Err(WsaError::singular("no harmonic order gives a fittable design"));
    }
    let scores: Vec<OrderScore> = evaluated.into_iter().map(|(score, _)| score).collect();

    let pick = |criterion: InformationCriterion| {
        let mut best: Option<(usize, f64)> = None;
        for (idx, score) in scores.iter().enumerate() {
            let value = criterion.value(&score.criteria);
            if !value.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, b)| value < b) {
                best = Some((idx, value));
            }
        }
        best.map(|(idx, _)| scores[idx].order)
            .unwrap_or(HarmonicOrder::NONE)
    };

    Ok(OrderSelection {
        aic: pick(InformationCriterion::Aic),
        aicc: pick(InformationCriterion::Aicc),
        bic: pick(InformationCriterion::Bic),
        scores,
    })
}
