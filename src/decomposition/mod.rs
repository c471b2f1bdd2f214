//! Seasonal adjustment of weekly series.
//!
//! [`WeeklyAdjustment`] runs the two-pass harmonic regression and returns a
//! [`Decomposition`]: either a [`SeasonalAdjustment`] with trend, seasonal,
//! holiday and outlier components, or a [`DegenerateDecomposition`] for a
//! series without seasonality.

mod engine;
mod result;

pub use engine::{WeeklyAdjustment, MIN_OBSERVATIONS};
pub use result::{Decomposition, DecompositionMode, DegenerateDecomposition, SeasonalAdjustment};

use crate::core::WeeklySeries;
use crate::error::Result;

/// Decompose `series` with default settings.
pub fn adjust(series: &WeeklySeries) -> Result<Decomposition> {
    WeeklyAdjustment::new().decompose(series)
}
