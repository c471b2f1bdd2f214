//! Ordinary and weighted least squares on a dense design.
//!
//! Fits go through the normal equations with a Cholesky factorisation, as
//! every caller also needs `(XᵀWX)⁻¹` for standard errors or rank-one
//! updates. Rank deficiency is reported as [`WsaError::SingularDesign`]
//! instead of producing NaN coefficients.

use crate::error::{Result, WsaError};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Smallest accepted share of a column's sum of squares left unexplained by
/// the preceding columns (`1 - R²` of that column on the others).
pub const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Coefficients and diagnostics of a least squares fit.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Estimated coefficients, one per design column.
    pub coefficients: DVector<f64>,
    /// Inverse of the (weighted) normal matrix `XᵀWX`.
    pub normal_inverse: DMatrix<f64>,
    /// Fitted values `Xβ`.
    pub fitted: DVector<f64>,
    /// Residuals `y - Xβ`.
    pub residuals: DVector<f64>,
    /// (Weighted) residual sum of squares.
    pub rss: f64,
}

impl LeastSquares {
    pub fn nobs(&self) -> usize {
        self.residuals.len()
    }

    pub fn ncoef(&self) -> usize {
        self.coefficients.len()
    }
}

/// Invert a symmetric positive definite normal matrix.
///
/// `context` names the fit in the error raised when the matrix is singular.
pub fn invert_normal_matrix(xtx: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    let p = xtx.nrows();
    if p == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }
    if xtx.iter().any(|v| !v.is_finite()) {
        return Err(WsaError::singular(format!("{}: non-finite normal matrix", context)));
    }

    let chol = xtx
        .clone()
        .cholesky()
        .ok_or_else(|| {
            WsaError::singular(format!("{}: normal matrix not positive definite", context))
        })?;

    let l = chol.l_dirty();
    for i in 0..p {
        let scale = xtx[(i, i)];
        if scale <= 0.0 || l[(i, i)] * l[(i, i)] / scale < SINGULAR_TOLERANCE {
            return Err(WsaError::singular(format!(
                "{}: column {} is (nearly) a combination of the others",
                context, i
            )));
        }
    }

    Ok(chol.inverse())
}

/// Fit `y = Xβ + e` by ordinary least squares.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LeastSquares> {
    check_shapes(x, y)?;
    let xtx = x.tr_mul(x);
    let xty = x.tr_mul(y);
    let normal_inverse = invert_normal_matrix(&xtx, "least squares fit")?;
    Ok(assemble(x, y, normal_inverse, &xty, None))
}

/// Fit `y = Xβ + e` by weighted least squares with non-negative row weights.
pub fn wls(x: &DMatrix<f64>, y: &DVector<f64>, weights: &DVector<f64>) -> Result<LeastSquares> {
    check_shapes(x, y)?;
    if weights.len() != y.len() {
        return Err(WsaError::DimensionMismatch {
            expected: y.len(),
            got: weights.len(),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(WsaError::InvalidParameter(
            "regression weights must be finite and non-negative".into(),
        ));
    }

    let xw = DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] * weights[i]);
    let xtx = xw.tr_mul(x);
    let xty = xw.tr_mul(y);
    let normal_inverse = invert_normal_matrix(&xtx, "weighted least squares fit")?;
    Ok(assemble(x, y, normal_inverse, &xty, Some(weights)))
}

fn check_shapes(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
    if y.is_empty() {
        return Err(WsaError::EmptyData);
    }
    if x.nrows() != y.len() {
        return Err(WsaError::DimensionMismatch {
            expected: y.len(),
            got: x.nrows(),
        });
    }
    Ok(())
}

fn assemble(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    normal_inverse: DMatrix<f64>,
    xty: &DVector<f64>,
    weights: Option<&DVector<f64>>,
) -> LeastSquares {
    let coefficients = &normal_inverse * xty;
    let fitted = x * &coefficients;
    let residuals = y - &fitted;
    let rss = match weights {
        Some(w) => residuals.iter().zip(w.iter()).map(|(e, wi)| wi * e * e).sum(),
        None => residuals.norm_squared(),
    };

    LeastSquares {
        coefficients,
        normal_inverse,
        fitted,
        residuals,
        rss,
    }
}

/// Gaussian information criteria of a fitted regression.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InformationCriteria {
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
}

impl InformationCriteria {
    /// Criteria of a model that could not be fitted.
    pub const UNFIT: InformationCriteria = InformationCriteria {
        aic: f64::INFINITY,
        aicc: f64::INFINITY,
        bic: f64::INFINITY,
    };
}

/// AIC, AICc and BIC for `n` observations, `coefficients` regressors and
/// residual sum of squares `rss`.
///
/// The error variance counts as a parameter, so `p = coefficients + 1`.
/// AICc is infinite when `n - p - 1 <= 0`. An exact fit is scored as if
/// `rss` were the smallest positive `f64`, so the criteria stay finite.
pub fn information_criteria(rss: f64, n: usize, coefficients: usize) -> InformationCriteria {
    if n == 0 {
        return InformationCriteria::UNFIT;
    }
    let n_f = n as f64;
    let p = (coefficients + 1) as f64;

    let rss = rss.max(f64::MIN_POSITIVE);
    let neg2_loglik = n_f * (2.0 * PI).ln() + n_f * (rss / n_f).ln() + n_f;
    let aic = neg2_loglik + 2.0 * p;
    let bic = neg2_loglik + p * n_f.ln();
    let aicc = if n_f - p - 1.0 > 0.0 {
        aic + 2.0 * p * (p + 1.0) / (n_f - p - 1.0)
    } else {
        f64::INFINITY
    };

    let finite_or_inf = |v: f64| if v.is_nan() { f64::INFINITY } else { v };
    InformationCriteria {
        aic: finite_or_inf(aic),
        aicc: finite_or_inf(aicc),
        bic: finite_or_inf(bic),
    }
}
