//! Harmonic regressors for yearly and monthly cycles.

use crate::core::{monthly_position, yearly_position};
use crate::error::{Result, WsaError};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use std::f64::consts::PI;
use std::fmt;

/// Number of sine/cosine pairs for the yearly and monthly cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarmonicOrder {
    /// Yearly sine/cosine pairs (k).
    pub yearly: usize,
    /// Monthly sine/cosine pairs (l).
    pub monthly: usize,
}

impl HarmonicOrder {
    /// The order of a series without seasonality.
    pub const NONE: HarmonicOrder = HarmonicOrder {
        yearly: 0,
        monthly: 0,
    };

    pub fn new(yearly: usize, monthly: usize) -> Self {
        Self { yearly, monthly }
    }

    /// Build an order from signed input, rejecting negative counts.
    pub fn from_signed(yearly: i64, monthly: i64) -> Result<Self> {
        if yearly < 0 || monthly < 0 {
            return Err(WsaError::InvalidParameter(format!(
                "harmonic orders must be non-negative, got ({}, {})",
                yearly, monthly
            )));
        }
        Ok(Self::new(yearly as usize, monthly as usize))
    }

    /// True when neither cycle has any harmonic.
    pub fn is_none(&self) -> bool {
        self.yearly == 0 && self.monthly == 0
    }

    /// Number of regressor columns this order produces.
    pub fn columns(&self) -> usize {
        2 * (self.yearly + self.monthly)
    }
}

impl fmt::Display for HarmonicOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.yearly, self.monthly)
    }
}

/// Harmonic regressors with stable column labels.
#[derive(Debug, Clone)]
pub struct HarmonicBasis {
    pub matrix: DMatrix<f64>,
    pub labels: Vec<String>,
}

/// Build the harmonic regressors for `order` on `dates`.
///
/// The yearly block comes first, then the monthly block. Within a block,
/// harmonic `j` contributes `sin(2πjt)` followed by `cos(2πjt)`, where `t` is
/// the date's position in its year (day of year over year length) or month
/// (day of month over month length).
pub fn harmonic_basis(order: HarmonicOrder, dates: &[NaiveDate]) -> HarmonicBasis {
    let n = dates.len();
    let mut matrix = DMatrix::zeros(n, order.columns());
    let mut labels = Vec::with_capacity(order.columns());

    let blocks: [(&str, usize, fn(NaiveDate) -> f64); 2] = [
        ("yearly", order.yearly, yearly_position),
        ("monthly", order.monthly, monthly_position),
    ];

    let mut col = 0;
    for (name, pairs, position) in blocks {
        if pairs == 0 {
            continue;
        }
        let t: Vec<f64> = dates.iter().map(|&d| position(d)).collect();
        for j in 1..=pairs {
            let freq = 2.0 * PI * j as f64;
            for (row, &ti) in t.iter().enumerate() {
                matrix[(row, col)] = (freq * ti).sin();
                matrix[(row, col + 1)] = (freq * ti).cos();
            }
            labels.push(format!("{}_sin_{}", name, j));
            labels.push(format!("{}_cos_{}", name, j));
            col += 2;
        }
    }

    HarmonicBasis { matrix, labels }
}
