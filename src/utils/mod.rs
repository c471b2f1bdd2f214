//! Utility functions shared by the estimation engine.

pub mod stats;

pub use stats::{mean, median, robust_scale, std_dev, variance, ROBUST_SCALE_FACTOR};
