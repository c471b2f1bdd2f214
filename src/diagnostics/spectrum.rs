//! Raw periodogram of a weekly series.

use crate::error::{Result, WsaError};
use crate::utils::{mean, median};
use rustfft::{num_complex::Complex64, FftPlanner};

/// Average number of weeks in a Gregorian year.
pub const WEEKS_PER_YEAR: f64 = 365.2425 / 7.0;

/// Periodogram ordinates at the Fourier frequencies `k / n`, `k = 1..=n/2`.
///
/// Frequencies are expressed in cycles per year.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spectrum {
    frequencies: Vec<f64>,
    power: Vec<f64>,
}

impl Spectrum {
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Frequency and power of the largest ordinate.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.power
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, p)| (self.frequencies[i], p))
    }

    /// Power at the Fourier frequency closest to `cycles_per_year`.
    pub fn power_near(&self, cycles_per_year: f64) -> Option<f64> {
        self.frequencies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - cycles_per_year)
                    .abs()
                    .partial_cmp(&(*b - cycles_per_year).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| self.power[i])
    }
}

/// Periodogram of `values` after removing the mean.
///
/// Power is `|X_k|² / n`.
pub fn periodogram(values: &[f64]) -> Result<Spectrum> {
    let n = values.len();
    if n < 4 {
        return Err(WsaError::InsufficientData { needed: 4, got: n });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(WsaError::InvalidParameter(
            "periodogram input must be finite".into(),
        ));
    }

    let centre = mean(values);
    let mut buffer: Vec<Complex64> = values
        .iter()
        .map(|&v| Complex64::new(v - centre, 0.0))
        .collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    let n_f = n as f64;
    let (frequencies, power): (Vec<f64>, Vec<f64>) = buffer
        .iter()
        .enumerate()
        .take(n / 2 + 1)
        .skip(1)
        .map(|(k, c)| (k as f64 * WEEKS_PER_YEAR / n_f, c.norm_sqr() / n_f))
        .unzip();

    Ok(Spectrum { frequencies, power })
}

/// Power at one cycle per year relative to the median ordinate.
///
/// Values well above one indicate yearly seasonality left in the series.
pub fn yearly_peak_ratio(spectrum: &Spectrum) -> f64 {
    let floor = median(spectrum.power());
    match spectrum.power_near(1.0) {
        Some(p) if floor > 0.0 => p / floor,
        Some(p) if p > 0.0 => f64::INFINITY,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn yearly_sine(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * i as f64 / WEEKS_PER_YEAR).sin())
            .collect()
    }

    fn hashed_noise(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = (i as f64 * 78.233).sin() * 43758.5453;
                x - x.floor() - 0.5
            })
            .collect()
    }

    #[test]
    fn frequencies_are_in_cycles_per_year() {
        let spectrum = periodogram(&yearly_sine(208)).unwrap();
        assert_eq!(spectrum.len(), 104);
        assert_relative_eq!(spectrum.frequencies()[0], WEEKS_PER_YEAR / 208.0, epsilon = 1e-12);
        assert_relative_eq!(spectrum.frequencies()[103], WEEKS_PER_YEAR / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn yearly_cycle_peaks_near_one() {
        let spectrum = periodogram(&yearly_sine(260)).unwrap();
        let (freq, _) = spectrum.peak().unwrap();
        assert!((freq - 1.0).abs() < 0.25);
        assert!(yearly_peak_ratio(&spectrum) > 50.0);
    }

    #[test]
    fn noise_has_no_yearly_peak() {
        let sine = periodogram(&yearly_sine(260)).unwrap();
        let noise = periodogram(&hashed_noise(260)).unwrap();
        assert!(yearly_peak_ratio(&noise) < yearly_peak_ratio(&sine));
    }

    #[test]
    fn constant_series_has_zero_power() {
        let spectrum = periodogram(&[3.0; 16]).unwrap();
        assert!(spectrum.power().iter().all(|p| p.abs() < 1e-20));
        assert_eq!(yearly_peak_ratio(&spectrum), 0.0);
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(matches!(
            periodogram(&[1.0, 2.0, 3.0]),
            Err(WsaError::InsufficientData { needed: 4, got: 3 })
        ));
    }
}
