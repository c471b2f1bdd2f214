//! # anofox-wsa
//!
//! Seasonal adjustment of weekly time series.
//!
//! A weekly series is split into a smooth trend, a yearly/monthly seasonal
//! pattern modelled by sine and cosine regressors, optional holiday effects,
//! additive outliers and the seasonally adjusted remainder. The harmonic
//! order is chosen by information criterion, outliers are found by a
//! stepwise t-statistic search, and seasonal factors are estimated per
//! calendar year with exponentially decaying weights on other years so the
//! pattern may drift over time.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod decomposition;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod parallel;
pub mod regression;
pub mod smoothing;
pub mod utils;

pub use error::{Result, WsaError};

pub mod prelude {
    pub use crate::core::{HolidayMatrix, WeeklySeries};
    pub use crate::decomposition::{
        adjust, Decomposition, DecompositionMode, SeasonalAdjustment, WeeklyAdjustment,
    };
    pub use crate::detection::InformationCriterion;
    pub use crate::error::{Result, WsaError};
    pub use crate::regression::HarmonicOrder;
    pub use crate::smoothing::{Loess, TrendSmoother};
}
