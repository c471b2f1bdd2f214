//! Two-pass seasonal adjustment engine.

use super::result::{
    Decomposition, DecompositionMode, DegenerateDecomposition, SeasonalAdjustment,
};
use crate::core::{HolidayMatrix, WeeklySeries};
use crate::detection::{
    search_outliers, select_order, InformationCriterion, OrderSelection, OutlierReport,
    OutlierSearch, OutlierSearchConfig, DEFAULT_OUTLIER_THRESHOLD,
};
use crate::error::{Result, WsaError};
use crate::regression::{
    fit_year_weighted, DesignMatrix, HarmonicOrder, WeightedComponents, YearWeights,
    DEFAULT_DECAY_RATE,
};
use crate::smoothing::{Loess, TrendSmoother};
use chrono::NaiveDate;
use log::debug;

/// Shortest series the engine accepts.
pub const MIN_OBSERVATIONS: usize = 4;

/// Weekly seasonal adjustment by harmonic regression.
///
/// Each run detrends the series with the smoother, identifies outliers and
/// the harmonic order on the detrended values, and fits one year-weighted
/// regression per calendar year. The adjusted series is then detrended
/// again and the identification and fit are repeated on the new target.
///
/// # Example
///
/// ```no_run
/// use anofox_wsa::prelude::*;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2019, 1, 6).unwrap();
/// let values: Vec<f64> = (0..260).map(|i| 100.0 + (i as f64 * 0.12).sin()).collect();
/// let series = WeeklySeries::from_start(start, values).unwrap();
///
/// let result = WeeklyAdjustment::new()
///     .with_outlier_threshold(4.0)
///     .decompose(&series)
///     .unwrap();
/// if let Some(adj) = result.adjustment() {
///     println!("order {}, {} outliers", adj.order, adj.outliers.len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WeeklyAdjustment<S: TrendSmoother = Loess> {
    decay_rate: f64,
    auto_outlier_search: bool,
    outlier_threshold: f64,
    fixed_outliers: Vec<NaiveDate>,
    harmonic_order: Option<HarmonicOrder>,
    holidays: Option<HolidayMatrix>,
    criterion: InformationCriterion,
    mode: DecompositionMode,
    smoother: S,
}

impl WeeklyAdjustment<Loess> {
    /// Engine with default settings and the default LOESS smoother.
    pub fn new() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            auto_outlier_search: true,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            fixed_outliers: Vec::new(),
            harmonic_order: None,
            holidays: None,
            criterion: InformationCriterion::default(),
            mode: DecompositionMode::default(),
            smoother: Loess::default(),
        }
    }
}

impl Default for WeeklyAdjustment<Loess> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one identification and fitting pass.
enum PassOutcome {
    NotSeasonal {
        note: String,
        selection: Option<OrderSelection>,
    },
    Fitted(PassFit),
}

struct PassFit {
    order: HarmonicOrder,
    outlier_rows: Vec<usize>,
    report: Option<OutlierReport>,
    selection: Option<OrderSelection>,
    components: WeightedComponents,
}

impl<S: TrendSmoother> WeeklyAdjustment<S> {
    /// Set the cross-year weight decay rate, in (0, 1).
    pub fn with_decay_rate(mut self, rate: f64) -> Self {
        self.decay_rate = rate;
        self
    }

    /// Enable or disable the automatic outlier search.
    pub fn with_outlier_search(mut self, enabled: bool) -> Self {
        self.auto_outlier_search = enabled;
        self
    }

    /// Set the |t| threshold for automatic outliers.
    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = threshold;
        self
    }

    /// Dates that are always modelled as additive outliers.
    pub fn with_fixed_outliers(mut self, dates: Vec<NaiveDate>) -> Self {
        self.fixed_outliers = dates;
        self
    }

    /// Use this harmonic order instead of selecting one.
    pub fn with_harmonic_order(mut self, order: HarmonicOrder) -> Self {
        self.harmonic_order = Some(order);
        self
    }

    /// Add holiday or trading-day regressors, row-aligned with the series.
    pub fn with_holidays(mut self, holidays: HolidayMatrix) -> Self {
        self.holidays = Some(holidays);
        self
    }

    /// Criterion for harmonic order selection.
    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_mode(mut self, mode: DecompositionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the trend smoother.
    pub fn with_smoother<T: TrendSmoother>(self, smoother: T) -> WeeklyAdjustment<T> {
        WeeklyAdjustment {
            decay_rate: self.decay_rate,
            auto_outlier_search: self.auto_outlier_search,
            outlier_threshold: self.outlier_threshold,
            fixed_outliers: self.fixed_outliers,
            harmonic_order: self.harmonic_order,
            holidays: self.holidays,
            criterion: self.criterion,
            mode: self.mode,
            smoother,
        }
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    pub fn outlier_threshold(&self) -> f64 {
        self.outlier_threshold
    }

    pub fn harmonic_order(&self) -> Option<HarmonicOrder> {
        self.harmonic_order
    }

    pub fn criterion(&self) -> InformationCriterion {
        self.criterion
    }

    pub fn mode(&self) -> DecompositionMode {
        self.mode
    }

    pub fn smoother(&self) -> &S {
        &self.smoother
    }

    /// Decompose a weekly series.
    ///
    /// Returns [`Decomposition::NotSeasonal`] when either pass resolves the
    /// harmonic order to (0, 0).
    pub fn decompose(&self, series: &WeeklySeries) -> Result<Decomposition> {
        let n = series.len();
        if n < MIN_OBSERVATIONS {
            return Err(WsaError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: n,
            });
        }
        if !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0) {
            return Err(WsaError::InvalidParameter(format!(
                "outlier threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        if let Some(h) = &self.holidays {
            h.check_rows(n)?;
        }
        let dates = series.dates();
        let weights = YearWeights::new(dates, self.decay_rate)?;
        let fixed_rows = self.fixed_rows(series)?;
        let x = self.model_values(series)?;

        debug!(
            "decomposing {} weeks ({} years), mode {:?}",
            n,
            weights.years().len(),
            self.mode
        );

        // Pass 1
        let trend1 = self.smoother.smooth(&x)?;
        let y1 = difference(&x, &trend1);
        let first = match self.run_pass(&y1, dates, &fixed_rows, &weights)? {
            PassOutcome::Fitted(fit) => fit,
            PassOutcome::NotSeasonal { note, selection } => {
                return Ok(self.degenerate(series, format!("pass 1: {}", note), selection));
            }
        };
        let sa1 = adjust_values(&x, &first.components);
        debug!(
            "pass 1 done: order {}, {} outliers",
            first.order,
            first.outlier_rows.len()
        );

        // Pass 2
        let trend2 = self.smoother.smooth(&sa1)?;
        let y2 = difference(&x, &trend2);
        let second = match self.run_pass(&y2, dates, &fixed_rows, &weights)? {
            PassOutcome::Fitted(fit) => fit,
            PassOutcome::NotSeasonal { note, selection } => {
                return Ok(self.degenerate(series, format!("pass 2: {}", note), selection));
            }
        };
        let sa2 = adjust_values(&x, &second.components);
        let trend = self.smoother.smooth(&sa2)?;
        debug!(
            "pass 2 done: order {}, {} outliers",
            second.order,
            second.outlier_rows.len()
        );

        Ok(Decomposition::Adjusted(self.assemble(series, sa2, trend, y2, second)))
    }

    /// Fixed outlier dates as sorted, distinct row indices.
    fn fixed_rows(&self, series: &WeeklySeries) -> Result<Vec<usize>> {
        let mut rows = self
            .fixed_outliers
            .iter()
            .map(|&date| {
                series.position(date).ok_or_else(|| {
                    WsaError::InvalidParameter(format!(
                        "fixed outlier {} is not an observation date",
                        date
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        rows.sort_unstable();
        rows.dedup();
        Ok(rows)
    }

    /// Input values on the scale the model is estimated on.
    fn model_values(&self, series: &WeeklySeries) -> Result<Vec<f64>> {
        if self.mode == DecompositionMode::Multiplicative {
            if let Some(pos) = series.values().iter().position(|&v| v <= 0.0) {
                return Err(WsaError::InvalidParameter(format!(
                    "multiplicative mode needs positive values, found {} at {}",
                    series.values()[pos],
                    series.dates()[pos]
                )));
            }
        }
        Ok(series
            .values()
            .iter()
            .map(|&v| self.mode.to_model_scale(v))
            .collect())
    }

    fn run_pass(
        &self,
        y: &[f64],
        dates: &[NaiveDate],
        fixed_rows: &[usize],
        weights: &YearWeights,
    ) -> Result<PassOutcome> {
        let holidays = self.holidays.as_ref();

        let mut outlier_rows = fixed_rows.to_vec();
        let mut report = None;
        if self.auto_outlier_search {
            let config = OutlierSearchConfig {
                threshold: self.outlier_threshold,
                fixed_rows: fixed_rows.to_vec(),
                order: self.harmonic_order,
                max_outliers: None,
            };
            match search_outliers(y, dates, holidays, &config)? {
                OutlierSearch::NoSeasonality => {
                    return Ok(PassOutcome::NotSeasonal {
                        note: "outlier search found no seasonality (order (0, 0))".into(),
                        selection: None,
                    });
                }
                OutlierSearch::Completed(found) => {
                    outlier_rows.extend_from_slice(&found.rows);
                    outlier_rows.sort_unstable();
                    report = Some(found);
                }
            }
        }

        let (order, selection) = match self.harmonic_order {
            Some(order) => (order, None),
            None => {
                let selection = select_order(y, dates, holidays, &outlier_rows)?;
                (selection.best(self.criterion), Some(selection))
            }
        };
        if order.is_none() {
            return Ok(PassOutcome::NotSeasonal {
                note: format!("{} selected harmonic order (0, 0)", self.criterion),
                selection,
            });
        }
        debug!("harmonic order {} with {} outliers", order, outlier_rows.len());

        let design = DesignMatrix::build(dates, order, holidays, &outlier_rows)?;
        let components = fit_year_weighted(y, &design, weights)?;

        Ok(PassOutcome::Fitted(PassFit {
            order,
            outlier_rows,
            report,
            selection,
            components,
        }))
    }

    fn degenerate(
        &self,
        series: &WeeklySeries,
        note: String,
        selection: Option<OrderSelection>,
    ) -> Decomposition {
        debug!("series is not seasonal: {}", note);
        Decomposition::NotSeasonal(DegenerateDecomposition {
            dates: series.dates().to_vec(),
            original: series.values().to_vec(),
            order: HarmonicOrder::NONE,
            note,
            order_selection: selection,
        })
    }

    fn assemble(
        &self,
        series: &WeeklySeries,
        sa: Vec<f64>,
        trend: Vec<f64>,
        detrended: Vec<f64>,
        fit: PassFit,
    ) -> SeasonalAdjustment {
        let back = |values: Vec<f64>| -> Vec<f64> {
            match self.mode {
                DecompositionMode::Additive => values,
                DecompositionMode::Multiplicative => values.into_iter().map(f64::exp).collect(),
            }
        };
        let dates = series.dates();
        let PassFit {
            order,
            outlier_rows,
            report,
            selection,
            components,
        } = fit;

        SeasonalAdjustment {
            dates: dates.to_vec(),
            original: series.values().to_vec(),
            seasonally_adjusted: back(sa),
            trend: back(trend),
            seasonal_factors: back(components.seasonal),
            holiday_factors: components.holiday.map(back),
            outlier_factors: components.outlier.map(back),
            order,
            coefficients: components.last_fit.coefficients.clone(),
            model: components.last_fit,
            outliers: outlier_rows.iter().map(|&r| dates[r]).collect(),
            outlier_report: report,
            order_selection: selection,
            detrended,
            mode: self.mode,
        }
    }
}

fn difference(x: &[f64], trend: &[f64]) -> Vec<f64> {
    x.iter().zip(trend).map(|(a, b)| a - b).collect()
}

/// `x - seasonal - outlier` on the model scale.
fn adjust_values(x: &[f64], components: &WeightedComponents) -> Vec<f64> {
    let mut sa = difference(x, &components.seasonal);
    if let Some(outlier) = &components.outlier {
        for (v, o) in sa.iter_mut().zip(outlier) {
            *v -= o;
        }
    }
    sa
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::yearly_position;
    use approx::assert_relative_eq;
    use chrono::Datelike;
    use std::f64::consts::PI;

    fn seasonal_series(years: usize) -> WeeklySeries {
        let start = NaiveDate::from_ymd_opt(2016, 1, 3).unwrap();
        let values = (0..52 * years)
            .map(|i| {
                let d = start + chrono::Duration::days(7 * i as i64);
                let x = (i as f64 * 12.9898).sin() * 43758.5453;
                let noise = x - x.floor() - 0.5;
                50.0 + 0.05 * i as f64 + 6.0 * (2.0 * PI * yearly_position(d)).sin() + noise
            })
            .collect();
        WeeklySeries::from_start(start, values).unwrap()
    }

    #[test]
    fn pinned_order_without_outliers_is_exact() {
        let series = seasonal_series(3);
        let engine = WeeklyAdjustment::new()
            .with_outlier_search(false)
            .with_harmonic_order(HarmonicOrder::new(2, 0));
        let adj = engine.decompose(&series).unwrap().into_adjustment().unwrap();

        assert!(adj.outlier_factors.is_none());
        assert!(adj.outliers.is_empty());
        assert!(adj.order_selection.is_none());
        for i in 0..series.len() {
            assert_eq!(adj.seasonally_adjusted[i], adj.original[i] - adj.seasonal_factors[i]);
        }
        assert_eq!(adj.order, HarmonicOrder::new(2, 0));
        assert_eq!(adj.coefficients.len(), 4);
        assert_eq!(adj.model.labels[0], "yearly_sin_1");
    }

    #[test]
    fn fixed_outliers_are_kept_and_identity_holds() {
        let mut series_values = seasonal_series(3).values().to_vec();
        series_values[20] += 15.0;
        let start = NaiveDate::from_ymd_opt(2016, 1, 3).unwrap();
        let series = WeeklySeries::from_start(start, series_values).unwrap();
        let date = series.dates()[20];

        let adj = WeeklyAdjustment::new()
            .with_outlier_search(false)
            .with_harmonic_order(HarmonicOrder::new(1, 0))
            .with_fixed_outliers(vec![date, date])
            .decompose(&series)
            .unwrap()
            .into_adjustment()
            .unwrap();

        assert_eq!(adj.outliers, vec![date]);
        let outlier = adj.outlier_factors.as_ref().unwrap();
        assert!(outlier[20] > 10.0);
        for i in 0..series.len() {
            let rebuilt = adj.seasonally_adjusted[i] + adj.seasonal_factors[i] + outlier[i];
            assert_relative_eq!(rebuilt, adj.original[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn pinned_null_order_is_degenerate() {
        let series = seasonal_series(2);
        let result = WeeklyAdjustment::new()
            .with_harmonic_order(HarmonicOrder::NONE)
            .decompose(&series)
            .unwrap();
        assert!(!result.is_seasonal());
        assert_eq!(result.order(), HarmonicOrder::NONE);
        assert_eq!(result.original(), series.values());
    }

    #[test]
    fn multiplicative_components_multiply_back() {
        let base = seasonal_series(3);
        let series = WeeklySeries::new(
            base.dates().to_vec(),
            base.values().iter().map(|v| v.max(1.0)).collect(),
        )
        .unwrap();
        let adj = WeeklyAdjustment::new()
            .with_outlier_search(false)
            .with_harmonic_order(HarmonicOrder::new(1, 0))
            .with_mode(DecompositionMode::Multiplicative)
            .decompose(&series)
            .unwrap()
            .into_adjustment()
            .unwrap();

        for i in 0..series.len() {
            let rebuilt = adj.seasonally_adjusted[i] * adj.seasonal_factors[i];
            assert_relative_eq!(rebuilt, adj.original[i], max_relative = 1e-9);
        }
        assert!(adj.seasonal_factors.iter().all(|s| *s > 0.0));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let series = seasonal_series(1);
        let missing = NaiveDate::from_ymd_opt(2016, 1, 4).unwrap();

        assert!(matches!(
            WeeklyAdjustment::new().with_decay_rate(1.5).decompose(&series),
            Err(WsaError::InvalidParameter(_))
        ));
        assert!(matches!(
            WeeklyAdjustment::new().with_outlier_threshold(-1.0).decompose(&series),
            Err(WsaError::InvalidParameter(_))
        ));
        assert!(matches!(
            WeeklyAdjustment::new().with_fixed_outliers(vec![missing]).decompose(&series),
            Err(WsaError::InvalidParameter(_))
        ));

        let negative = WeeklySeries::from_start(missing, vec![1.0, -2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            WeeklyAdjustment::new()
                .with_mode(DecompositionMode::Multiplicative)
                .decompose(&negative),
            Err(WsaError::InvalidParameter(_))
        ));

        let short = WeeklySeries::from_start(missing, vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            WeeklyAdjustment::new().decompose(&short),
            Err(WsaError::InsufficientData { needed: 4, got: 2 })
        ));
    }

    #[test]
    fn holiday_rows_must_match() {
        let series = seasonal_series(1);
        let holidays = HolidayMatrix::new(vec!["x".into()], vec![vec![0.0; 10]]).unwrap();
        assert!(matches!(
            WeeklyAdjustment::new().with_holidays(holidays).decompose(&series),
            Err(WsaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn smoother_can_be_replaced() {
        struct Flat;
        impl TrendSmoother for Flat {
            fn smooth(&self, values: &[f64]) -> Result<Vec<f64>> {
                let m = values.iter().sum::<f64>() / values.len() as f64;
                Ok(vec![m; values.len()])
            }
        }

        let series = seasonal_series(2);
        let engine = WeeklyAdjustment::new()
            .with_outlier_search(false)
            .with_harmonic_order(HarmonicOrder::new(1, 0))
            .with_smoother(Flat);
        let adj = engine.decompose(&series).unwrap().into_adjustment().unwrap();
        let first = adj.trend[0];
        assert!(adj.trend.iter().all(|t| (*t - first).abs() < 1e-12));
        assert_eq!(adj.dates[0].year(), 2016);
    }
}
