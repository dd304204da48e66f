//! Dense linear algebra shared by the integration strategies.
//!
//! Matrices are `ndarray::Array2<f64>` laid out cells × features. The
//! decompositions come from `ndarray-linalg`; this module only adds the
//! operator seam the randomized SVD needs and a few row helpers.

pub mod svd;

use ndarray::{Array2, ArrayView2, Axis, ShapeError, concatenate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinalgError {
    #[error("dimension mismatch: {0}")]
    Dimension(String),
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
    #[error("lapack: {0}")]
    Lapack(#[from] ndarray_linalg::error::LinalgError),
    #[error("decomposition returned no singular vectors")]
    NoVectors,
}

impl LinalgError {
    /// True when the failure comes from the input's shape rather than its
    /// numerical content.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            LinalgError::Dimension(_)
                | LinalgError::Shape(_)
                | LinalgError::Lapack(ndarray_linalg::error::LinalgError::NotSquare { .. })
        )
    }
}

/// A matrix that can only be multiplied, never materialised.
pub trait LinearOperator {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    /// `A · x` for `x` of shape `ncols × b`.
    fn apply(&self, x: &Array2<f64>) -> Array2<f64>;
    /// `Aᵀ · x` for `x` of shape `nrows × b`.
    fn apply_t(&self, x: &Array2<f64>) -> Array2<f64>;
}

impl LinearOperator for Array2<f64> {
    fn nrows(&self) -> usize {
        self.shape()[0]
    }

    fn ncols(&self) -> usize {
        self.shape()[1]
    }

    fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        self.dot(x)
    }

    fn apply_t(&self, x: &Array2<f64>) -> Array2<f64> {
        self.t().dot(x)
    }
}

/// `left · rightᵀ`, e.g. the cell × cell cross-product of two scaled
/// expression matrices sharing their feature columns.
pub struct CrossProduct<'a> {
    pub left: ArrayView2<'a, f64>,
    pub right: ArrayView2<'a, f64>,
}

impl LinearOperator for CrossProduct<'_> {
    fn nrows(&self) -> usize {
        self.left.nrows()
    }

    fn ncols(&self) -> usize {
        self.right.nrows()
    }

    fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        self.left.dot(&self.right.t().dot(x))
    }

    fn apply_t(&self, x: &Array2<f64>) -> Array2<f64> {
        self.right.dot(&self.left.t().dot(x))
    }
}

/// Stacks `parts` top to bottom.
pub fn vstack(parts: &[Array2<f64>]) -> Result<Array2<f64>, LinalgError> {
    if parts.is_empty() {
        return Err(LinalgError::Dimension("nothing to stack".to_string()));
    }
    let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

pub fn l2_normalize_rows(m: &mut Array2<f64>) {
    for mut row in m.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 1e-15 {
            row /= norm;
        }
    }
}

/// Row-major `f32` copy, the layout written to the embedding table.
pub fn to_f32(m: &Array2<f64>) -> Vec<f32> {
    m.iter().map(|v| *v as f32).collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/linalg/mod.rs"]
mod tests;
