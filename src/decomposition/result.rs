//! Decomposition results.

use crate::detection::{OrderSelection, OutlierReport};
use crate::diagnostics::{periodogram, Spectrum};
use crate::error::Result;
use crate::regression::{HarmonicOrder, RegressionFit};
use crate::utils::variance;
use chrono::NaiveDate;

/// How components combine into the observed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecompositionMode {
    /// `x = sa + seasonal + outlier`.
    #[default]
    Additive,
    /// `x = sa · seasonal · outlier`, estimated on the log scale.
    Multiplicative,
}

impl DecompositionMode {
    /// Remove a component from the series (subtract or divide).
    pub(crate) fn remove(&self, value: f64, component: f64) -> f64 {
        match self {
            DecompositionMode::Additive => value - component,
            DecompositionMode::Multiplicative => value / component,
        }
    }

    /// Move a value onto the scale the model is estimated on.
    pub(crate) fn to_model_scale(&self, value: f64) -> f64 {
        match self {
            DecompositionMode::Additive => value,
            DecompositionMode::Multiplicative => value.ln(),
        }
    }
}

/// A completed seasonal adjustment.
///
/// Component series are aligned with `dates`. In multiplicative mode every
/// component has been exponentiated on its own, so trend and adjusted
/// series are only approximately consistent with each other.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeasonalAdjustment {
    pub dates: Vec<NaiveDate>,
    /// The input values.
    pub original: Vec<f64>,
    /// Input with seasonal and outlier effects removed.
    pub seasonally_adjusted: Vec<f64>,
    /// Smoothed trend of the adjusted series.
    pub trend: Vec<f64>,
    pub seasonal_factors: Vec<f64>,
    /// Holiday effects, reported but not removed from `seasonally_adjusted`.
    pub holiday_factors: Option<Vec<f64>>,
    /// Additive outlier effects; `None` when the model has no outliers.
    pub outlier_factors: Option<Vec<f64>>,
    /// Harmonic order of the final fit.
    pub order: HarmonicOrder,
    /// Coefficients of the last year's weighted fit.
    pub coefficients: Vec<f64>,
    /// The last year's weighted fit.
    pub model: RegressionFit,
    /// Outlier dates in the final model (fixed and detected), ascending.
    pub outliers: Vec<NaiveDate>,
    /// Report of the final outlier search, when it ran.
    pub outlier_report: Option<OutlierReport>,
    /// Order selection table of the final pass, when the order was not pinned.
    pub order_selection: Option<OrderSelection>,
    /// Target of the final regression (input minus second-pass trend, model scale).
    pub detrended: Vec<f64>,
    pub mode: DecompositionMode,
}

impl SeasonalAdjustment {
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Adjusted series with holiday effects also removed.
    pub fn calendar_adjusted(&self) -> Vec<f64> {
        match &self.holiday_factors {
            Some(holiday) => self
                .seasonally_adjusted
                .iter()
                .zip(holiday)
                .map(|(&sa, &h)| self.mode.remove(sa, h))
                .collect(),
            None => self.seasonally_adjusted.clone(),
        }
    }

    /// Adjusted series with the trend removed, on the model scale.
    pub fn irregular(&self) -> Vec<f64> {
        self.seasonally_adjusted
            .iter()
            .zip(&self.trend)
            .map(|(&sa, &t)| self.mode.to_model_scale(sa) - self.mode.to_model_scale(t))
            .collect()
    }

    /// Periodogram of the irregular component.
    ///
    /// A peak near one cycle per year points to seasonality the model missed.
    pub fn residual_spectrum(&self) -> Result<Spectrum> {
        periodogram(&self.irregular())
    }

    /// Periodogram of the detrended series the final fit was run on.
    pub fn detrended_spectrum(&self) -> Result<Spectrum> {
        periodogram(&self.detrended)
    }

    /// Share of the detrended variance explained by the seasonal factors, in [0, 1].
    pub fn seasonal_strength(&self) -> f64 {
        let seasonal: Vec<f64> = self
            .seasonal_factors
            .iter()
            .map(|&s| self.mode.to_model_scale(s))
            .collect();
        let irregular = self.irregular();
        let seasonal_plus_irregular: Vec<f64> = seasonal
            .iter()
            .zip(&irregular)
            .map(|(s, r)| s + r)
            .collect();
        let var_sr = variance(&seasonal_plus_irregular);

        if var_sr.is_nan() || var_sr < 1e-10 {
            return 0.0;
        }
        (1.0 - variance(&irregular) / var_sr).clamp(0.0, 1.0)
    }
}

/// Result for a series without seasonality: order (0, 0) and no components.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DegenerateDecomposition {
    pub dates: Vec<NaiveDate>,
    pub original: Vec<f64>,
    pub order: HarmonicOrder,
    /// Why the decomposition stopped.
    pub note: String,
    /// Order selection table that resolved to (0, 0), if one was run.
    pub order_selection: Option<OrderSelection>,
}

/// Outcome of a decomposition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decomposition {
    Adjusted(SeasonalAdjustment),
    NotSeasonal(DegenerateDecomposition),
}

impl Decomposition {
    pub fn is_seasonal(&self) -> bool {
        matches!(self, Decomposition::Adjusted(_))
    }

    pub fn adjustment(&self) -> Option<&SeasonalAdjustment> {
        match self {
            Decomposition::Adjusted(adj) => Some(adj),
            Decomposition::NotSeasonal(_) => None,
        }
    }

    pub fn into_adjustment(self) -> Option<SeasonalAdjustment> {
        match self {
            Decomposition::Adjusted(adj) => Some(adj),
            Decomposition::NotSeasonal(_) => None,
        }
    }

    pub fn order(&self) -> HarmonicOrder {
        match self {
            Decomposition::Adjusted(adj) => adj.order,
            Decomposition::NotSeasonal(deg) => deg.order,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        match self {
            Decomposition::Adjusted(adj) => &adj.dates,
            Decomposition::NotSeasonal(deg) => &deg.dates,
        }
    }

    pub fn original(&self) -> &[f64] {
        match self {
            Decomposition::Adjusted(adj) => &adj.original,
            Decomposition::NotSeasonal(deg) => &deg.original,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn modes_remove_components() {
        assert_relative_eq!(DecompositionMode::Additive.remove(10.0, 4.0), 6.0);
        assert_relative_eq!(DecompositionMode::Multiplicative.remove(10.0, 4.0), 2.5);
        assert_relative_eq!(DecompositionMode::Multiplicative.to_model_scale(1.0), 0.0);
        assert_eq!(DecompositionMode::default(), DecompositionMode::Additive);
    }

    #[test]
    fn degenerate_result_exposes_input() {
        let dates = vec![NaiveDate::from_ymd_opt(2021, 1, 3).unwrap()];
        let result = Decomposition::NotSeasonal(DegenerateDecomposition {
            dates: dates.clone(),
            original: vec![1.5],
            order: HarmonicOrder::NONE,
            note: "no seasonality".into(),
            order_selection: None,
        });
        assert!(!result.is_seasonal());
        assert!(result.adjustment().is_none());
        assert_eq!(result.order(), HarmonicOrder::NONE);
        assert_eq!(result.dates(), dates.as_slice());
        assert_eq!(result.original(), &[1.5]);
    }
}
