//! Coefficient table of a fitted regression.

use super::ols::{information_criteria, InformationCriteria, LeastSquares};
use crate::error::{Result, WsaError};
use nalgebra::DVector;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// A fitted regression with standard errors and significance tests.
///
/// Weighted fits are reported with weights rescaled to mean one, which
/// leaves coefficients and standard errors unchanged and keeps the residual
/// standard error on the scale of the data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegressionFit {
    /// Column labels of the design.
    pub labels: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    /// Two-sided p values from Student's t with `df_residual` degrees of freedom.
    pub p_values: Vec<f64>,
    /// Residual standard error.
    pub sigma: f64,
    pub df_residual: usize,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Row weights (mean one) for weighted fits.
    pub weights: Option<Vec<f64>>,
    /// Information criteria; only defined for unweighted fits.
    pub criteria: Option<InformationCriteria>,
}

impl RegressionFit {
    /// Summarise a least squares fit.
    pub fn from_least_squares(
        labels: &[String],
        fit: &LeastSquares,
        weights: Option<&DVector<f64>>,
    ) -> Result<Self> {
        let n = fit.nobs();
        let p = fit.ncoef();
        if labels.len() != p {
            return Err(WsaError::DimensionMismatch {
                expected: p,
                got: labels.len(),
            });
        }

        let (scale, weights_out) = match weights {
            Some(w) => {
                let total: f64 = w.iter().sum();
                if total <= 0.0 {
                    return Err(WsaError::InvalidParameter(
                        "regression weights sum to zero".into(),
                    ));
                }
                let s = n as f64 / total;
                (s, Some(w.iter().map(|wi| wi * s).collect::<Vec<f64>>()))
            }
            None => (1.0, None),
        };

        let df_residual = n.saturating_sub(p);
        let sigma2 = if df_residual > 0 {
            scale * fit.rss / df_residual as f64
        } else {
            f64::NAN
        };

        let std_errors: Vec<f64> = (0..p)
            .map(|j| (sigma2 * fit.normal_inverse[(j, j)] / scale).sqrt())
            .collect();
        let coefficients: Vec<f64> = fit.coefficients.iter().copied().collect();
        let t_values: Vec<f64> = coefficients
            .iter()
            .zip(&std_errors)
            .map(|(b, se)| b / se)
            .collect();

        let p_values = match StudentsT::new(0.0, 1.0, df_residual as f64) {
            Ok(dist) if df_residual > 0 => t_values
                .iter()
                .map(|t| {
                    if t.is_finite() {
                        2.0 * (1.0 - dist.cdf(t.abs()))
                    } else if t.is_nan() {
                        f64::NAN
                    } else {
                        0.0
                    }
                })
                .collect(),
            _ => vec![f64::NAN; p],
        };

        let criteria = match weights {
            Some(_) => None,
            None => Some(information_criteria(fit.rss, n, p)),
        };

        Ok(Self {
            labels: labels.to_vec(),
            coefficients,
            std_errors,
            t_values,
            p_values,
            sigma: sigma2.sqrt(),
            df_residual,
            fitted: fit.fitted.iter().copied().collect(),
            residuals: fit.residuals.iter().copied().collect(),
            weights: weights_out,
            criteria,
        })
    }

    pub fn nobs(&self) -> usize {
        self.residuals.len()
    }

    /// Coefficient of the column with the given label.
    pub fn coefficient(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.coefficients[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::ols::{ols, wls};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn line_data() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_fn(6, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
        let y = DVector::from_vec(vec![1.1, 2.9, 5.2, 6.8, 9.1, 11.0]);
        (x, y)
    }

    #[test]
    fn standard_errors_match_textbook_formula() {
        let (x, y) = line_data();
        let fit = ols(&x, &y).unwrap();
        let labels = vec!["const".to_string(), "slope".to_string()];
        let summary = RegressionFit::from_least_squares(&labels, &fit, None).unwrap();

        let sigma2 = fit.rss / 4.0;
        // Var(slope) = sigma² / Σ(x - x̄)², Σ(x - x̄)² = 17.5 for x = 0..5
        assert_relative_eq!(summary.std_errors[1], (sigma2 / 17.5).sqrt(), epsilon = 1e-10);
        assert_eq!(summary.df_residual, 4);
        assert_relative_eq!(summary.sigma, sigma2.sqrt(), epsilon = 1e-12);
        assert!(summary.p_values[1] < 1e-4);
        assert!(summary.criteria.is_some());
        assert_eq!(summary.coefficient("slope"), Some(summary.coefficients[1]));
        assert_eq!(summary.coefficient("missing"), None);
    }

    #[test]
    fn weighted_summary_is_scale_free() {
        let (x, y) = line_data();
        let w = DVector::from_vec(vec![0.05, 0.1, 0.2, 0.3, 0.2, 0.15]);
        let labels = vec!["const".to_string(), "slope".to_string()];

        let fit = wls(&x, &y, &w).unwrap();
        let a = RegressionFit::from_least_squares(&labels, &fit, Some(&w)).unwrap();
        let w_big = &w * 1000.0;
        let fit_big = wls(&x, &y, &w_big).unwrap();
        let b = RegressionFit::from_least_squares(&labels, &fit_big, Some(&w_big)).unwrap();

        assert_relative_eq!(a.std_errors[1], b.std_errors[1], epsilon = 1e-10);
        assert_relative_eq!(a.sigma, b.sigma, epsilon = 1e-10);
        assert!(a.criteria.is_none());
        let mean_weight: f64 = a.weights.as_ref().unwrap().iter().sum::<f64>() / 6.0;
        assert_relative_eq!(mean_weight, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn label_count_must_match() {
        let (x, y) = line_data();
        let fit = ols(&x, &y).unwrap();
        assert!(RegressionFit::from_least_squares(&["only".to_string()], &fit, None).is_err());
    }
}
