//! # Distributed Dense Primitives
//!
//! The minimum vocabulary of dense linear algebra the incremental kernel
//! needs, with correct behavior under row-partitioning: matrices and vectors
//! are stored as their local row block, reductions go through the process
//! group. Everything replicated (small matrices, reduced coordinates) is
//! plain `ndarray` and never touches the transport.

use anyhow::bail;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};

use crate::comm::ProcessGroup;

/// Collective inner product of two row-partitioned vectors.
pub fn inner_product<G: ProcessGroup>(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    comm: &G,
) -> anyhow::Result<f64> {
    if x.len() != y.len() {
        bail!(
            "inner product of vectors with {} and {} local rows",
            x.len(),
            y.len()
        );
    }
    let mut acc = [x.dot(&y)];
    comm.all_reduce_sum(&mut acc)?;
    Ok(acc[0])
}

/// Collective Euclidean norm of a row-partitioned vector.
pub fn norm<G: ProcessGroup>(x: ArrayView1<f64>, comm: &G) -> anyhow::Result<f64> {
    Ok(inner_product(x, x, comm)?.sqrt())
}

/// Collective `Mᵀx` for a row-partitioned `M` and conforming vector `x`.
///
/// The local product costs no communication; one all-reduce makes the
/// length-`ncols` result fully replicated.
pub fn transposed_matvec<G: ProcessGroup>(
    m: ArrayView2<f64>,
    x: ArrayView1<f64>,
    comm: &G,
) -> anyhow::Result<Array1<f64>> {
    if m.nrows() != x.len() {
        bail!(
            "matrix with {} local rows applied to vector with {}",
            m.nrows(),
            x.len()
        );
    }
    let mut p = m.t().dot(&x);
    comm.all_reduce_sum(p.as_slice_mut().expect("product of dot is contiguous"))?;
    Ok(p)
}

/// Collective Gram matrix `MᵀM` of a row-partitioned `M`, fully replicated.
pub fn gram<G: ProcessGroup>(m: ArrayView2<f64>, comm: &G) -> anyhow::Result<Array2<f64>> {
    let mut g = m.t().dot(&m);
    comm.all_reduce_sum(g.as_slice_mut().expect("product of dot is contiguous"))?;
    Ok(g)
}

/// Local `y ← αx + βy`. No communication.
pub fn axpby(alpha: f64, x: ArrayView1<f64>, beta: f64, mut y: ArrayViewMut1<f64>) {
    y.zip_mut_with(&x, |yi, &xi| *yi = alpha * xi + beta * *yi);
}

/// Global row count of a row-partitioned entity.
pub fn global_rows<G: ProcessGroup>(local_rows: usize, comm: &G) -> anyhow::Result<usize> {
    let mut acc = [local_rows as f64];
    comm.all_reduce_sum(&mut acc)?;
    Ok(acc[0] as usize)
}
