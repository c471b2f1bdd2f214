//! Model identification for the harmonic seasonal regression.
//!
//! This module provides:
//! - Harmonic order selection over a fixed grid by AIC, AICc or BIC
//! - Additive outlier search by forward selection and backward elimination

mod order;
mod outlier;

pub use order::{
    order_grid, select_order, InformationCriterion, OrderScore, OrderSelection, MONTHLY_GRID,
    ORDER_STEP, YEARLY_GRID,
};
pub use outlier::{
    search_outliers, OutlierReport, OutlierSearch, OutlierSearchConfig, DEFAULT_OUTLIER_THRESHOLD,
};
