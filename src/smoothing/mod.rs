//! Trend smoothers used to detrend a series before the seasonal regression.
//!
//! The decomposition only needs a smoothed copy of a series, so any
//! scatterplot smoother can be plugged in through [`TrendSmoother`].

mod loess;

pub use loess::{Loess, DEFAULT_LOESS_WINDOW, DEFAULT_ROBUSTNESS_ITERATIONS};

use crate::error::Result;

/// A smoother producing one trend value per observation.
pub trait TrendSmoother {
    /// Smooth `values`, returning a series of the same length.
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>>;
}

impl<T: TrendSmoother + ?Sized> TrendSmoother for &T {
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>> {
        (**self).smooth(values)
    }
}
