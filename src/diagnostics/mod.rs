//! Spectral diagnostics for residual seasonality.

mod spectrum;

pub use spectrum::{periodogram, yearly_peak_ratio, Spectrum, WEEKS_PER_YEAR};
