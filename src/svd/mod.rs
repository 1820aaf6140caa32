//! # Small Replicated SVD
//!
//! Dense SVD of the small replicated working matrices (at most
//! `(r+1) x (r+1)`). Every process computes it redundantly from identical
//! input; faer's kernel is pure Rust and deterministic, so the factors come
//! out bit-identical everywhere without a broadcast.

use anyhow::anyhow;
use faer_ext::{IntoFaer, IntoNdarray};
use ndarray::{Array1, Array2, ArrayView2};

pub struct SmallSvd {
    u: Array2<f64>,
    s: Array1<f64>,
    v: Array2<f64>,
}

impl SmallSvd {
    pub fn new(array: &ArrayView2<f64>) -> anyhow::Result<Self> {
        let faer_mat = array.into_faer().to_owned();
        let svd = faer_mat
            .svd()
            .map_err(|e| anyhow!("dense svd did not converge: {e:?}"))?;
        let u = svd.U().into_ndarray().to_owned();
        let s = Array1::from_iter(svd.S().column_vector().iter().copied());
        let v = svd.V().into_ndarray().to_owned();

        Ok(SmallSvd { u, s, v })
    }

    /// Left singular vectors.
    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    /// Singular values, non-negative and non-increasing.
    pub fn s(&self) -> &Array1<f64> {
        &self.s
    }

    /// Right singular vectors, not transposed.
    pub fn v(&self) -> &Array2<f64> {
        &self.v
    }

    // Reconstruct the original matrix
    pub fn reconstruct(&self) -> Array2<f64> {
        let s_diag = Array2::from_diag(&self.s);
        self.u.dot(&s_diag).dot(&self.v.t())
    }
}
