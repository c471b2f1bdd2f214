//! Robust local-linear LOESS.

use super::TrendSmoother;
use crate::error::{Result, WsaError};
use crate::utils::median;

/// Default smoothing window in weeks (about two years).
pub const DEFAULT_LOESS_WINDOW: usize = 105;

/// Default number of bisquare robustness passes.
pub const DEFAULT_ROBUSTNESS_ITERATIONS: usize = 2;

/// Residuals above this multiple of the median absolute residual get zero weight.
const BISQUARE_CUTOFF: f64 = 6.0;

/// LOESS smoother with tricube neighbourhood weights and bisquare
/// robustness reweighting.
///
/// Each point is fitted by a weighted straight line over the `window`
/// nearest observations. Near the ends the neighbourhood shifts inwards so it
/// always holds `min(window, n)` points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Loess {
    window: usize,
    robustness_iterations: usize,
}

impl Loess {
    /// Create a smoother over `window` observations (rounded up to odd).
    pub fn new(window: usize) -> Self {
        Self {
            window: if window % 2 == 0 { window + 1 } else { window },
            robustness_iterations: DEFAULT_ROBUSTNESS_ITERATIONS,
        }
    }

    /// Set the number of robustness passes (0 disables reweighting).
    pub fn with_robustness_iterations(mut self, n: usize) -> Self {
        self.robustness_iterations = n;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn robustness_iterations(&self) -> usize {
        self.robustness_iterations
    }

    fn fit(&self, values: &[f64], robustness: &[f64]) -> Vec<f64> {
        let n = values.len();
        let span = self.window.min(n);
        let half = self.window / 2;

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half).min(n - span);
                let end = start + span;
                let max_dist = (i - start).max(end - 1 - i) as f64 + 1.0;

                let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
                for j in start..end {
                    let x = j as f64 - i as f64;
                    let u = x.abs() / max_dist;
                    let tricube = (1.0 - u.powi(3)).powi(3);
                    let w = tricube * robustness[j];
                    sw += w;
                    swx += w * x;
                    swy += w * values[j];
                    swxx += w * x * x;
                    swxy += w * x * values[j];
                }

                if sw <= 0.0 {
                    return values[i];
                }
                let denom = sw * swxx - swx * swx;
                if denom.abs() <= 1e-12 * sw * swxx.max(1.0) {
                    return swy / sw;
                }
                let slope = (sw * swxy - swx * swy) / denom;
                (swy - slope * swx) / sw
            })
            .collect()
    }
}

impl Default for Loess {
    fn default() -> Self {
        Self::new(DEFAULT_LOESS_WINDOW)
    }
}

impl TrendSmoother for Loess {
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.is_empty() {
            return Err(WsaError::EmptyData);
        }
        if self.window < 3 {
            return Err(WsaError::InvalidParameter(format!(
                "LOESS window must be at least 3, got {}",
                self.window
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(WsaError::ComputationError(
                "cannot smooth non-finite values".into(),
            ));
        }
        if values.len() < 3 {
            return Ok(values.to_vec());
        }

        let mut weights = vec![1.0; values.len()];
        let mut fitted = self.fit(values, &weights);
        for _ in 0..self.robustness_iterations {
            let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(v, f)| v - f).collect();
            weights = bisquare_weights(&residuals);
            fitted = self.fit(values, &weights);
        }
        Ok(fitted)
    }
}

fn bisquare_weights(residuals: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let h = BISQUARE_CUTOFF * median(&abs);
    residuals
        .iter()
        .map(|r| {
            if h < 1e-10 {
                return 1.0;
            }
            let u = r.abs() / h;
            if u < 1.0 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reproduces_straight_lines() {
        let values: Vec<f64> = (0..60).map(|i| 2.0 + 0.5 * i as f64).collect();
        let smoothed = Loess::new(15).smooth(&values).unwrap();
        for (s, v) in smoothed.iter().zip(&values) {
            assert_relative_eq!(*s, *v, epsilon = 1e-9);
        }
    }

    #[test]
    fn window_is_odd() {
        assert_eq!(Loess::new(104).window(), 105);
        assert_eq!(Loess::default().window(), DEFAULT_LOESS_WINDOW);
        assert_eq!(Loess::default().robustness_iterations(), 2);
    }

    #[test]
    fn long_window_covers_whole_series() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();
        let smoothed = Loess::new(501).smooth(&values).unwrap();
        assert_eq!(smoothed.len(), values.len());
        assert!(smoothed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn robustness_ignores_spike() {
        let mut values: Vec<f64> = (0..80)
            .map(|i| 0.2 * i as f64 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        values[40] += 100.0;

        let robust = Loess::new(21).smooth(&values).unwrap();
        let plain = Loess::new(21)
            .with_robustness_iterations(0)
            .smooth(&values)
            .unwrap();

        assert!((robust[40] - 8.0).abs() < 0.5);
        assert!((plain[40] - 8.0).abs() > (robust[40] - 8.0).abs());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(Loess::default().smooth(&[]), Err(WsaError::EmptyData)));
        assert!(Loess::default().smooth(&[1.0, f64::NAN, 2.0]).is_err());
        assert!(Loess::new(1).smooth(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn short_series_pass_through() {
        assert_eq!(Loess::default().smooth(&[4.0, 5.0]).unwrap(), vec![4.0, 5.0]);
    }
}
