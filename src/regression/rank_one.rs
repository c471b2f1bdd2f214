//! Inverse of a cross-product matrix after appending one column.
//!
//! Given `A = (XᵀX)⁻¹` and a new column `v`, the inverse of `[X v]ᵀ[X v]` is
//!
//! ```text
//! u1 = Xᵀv,  u2 = A u1,  d = 1 / (vᵀv - u1ᵀu2)
//!
//! | A + d u2 u2ᵀ   -d u2 |
//! |   -d u2ᵀ         d   |
//! ```
//!
//! which costs O(np + p²) instead of a fresh O(p³) factorisation.

use crate::error::{Result, WsaError};
use nalgebra::{DMatrix, DVector};

/// Relative size of `vᵀv - u1ᵀu2` below which `v` is treated as collinear.
pub const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// Append column `v` to a design and return the updated inverse.
///
/// `inverse` is `(XᵀX)⁻¹` for a design with `p` columns and `xt` is `Xᵀ`
/// (`p × n`). Fails with [`WsaError::CollinearCandidate`] when `v` lies
/// (numerically) in the column space of `X`.
pub fn augment_inverse(
    inverse: &DMatrix<f64>,
    xt: &DMatrix<f64>,
    v: &DVector<f64>,
) -> Result<DMatrix<f64>> {
    let p = inverse.nrows();
    if inverse.ncols() != p || xt.nrows() != p {
        return Err(WsaError::DimensionMismatch {
            expected: p,
            got: xt.nrows(),
        });
    }
    if xt.ncols() != v.len() {
        return Err(WsaError::DimensionMismatch {
            expected: xt.ncols(),
            got: v.len(),
        });
    }

    let vtv = v.norm_squared();
    let u1 = xt * v;
    let u2 = inverse * &u1;
    let schur = vtv - u1.dot(&u2);
    if !schur.is_finite() || schur <= COLLINEAR_TOLERANCE * vtv {
        return Err(WsaError::CollinearCandidate);
    }
    let d = 1.0 / schur;

    Ok(DMatrix::from_fn(p + 1, p + 1, |i, j| match (i < p, j < p) {
        (true, true) => inverse[(i, j)] + d * u2[i] * u2[j],
        (true, false) => -d * u2[i],
        (false, true) => -d * u2[j],
        (false, false) => d,
    }))
}
