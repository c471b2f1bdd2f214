//! Regression machinery for the harmonic seasonal model.
//!
//! - Harmonic basis construction for yearly and monthly cycles
//! - Design matrices with fixed harmonic/holiday/outlier blocks
//! - Ordinary and weighted least squares with information criteria
//! - Rank-one inverse updates for incremental column additions
//! - Year-weighted fits producing time-varying components

pub mod basis;
pub mod design;
pub mod ols;
pub mod rank_one;
pub mod summary;
pub mod weighted;

pub use basis::{harmonic_basis, HarmonicBasis, HarmonicOrder};
pub use design::{Block, DesignMatrix};
pub use ols::{
    information_criteria, invert_normal_matrix, ols, wls, InformationCriteria, LeastSquares,
};
pub use rank_one::augment_inverse;
pub use summary::RegressionFit;
pub use weighted::{fit_year_weighted, WeightedComponents, YearWeights, DEFAULT_DECAY_RATE};
