//! # Incremental SVD Kernels
//!
//! The online algorithm: given the current factorization `U·Σ·Vᵀ` (with the
//! left factor row-partitioned across the process group) and one new snapshot
//! per process row block, produce the next factorization without ever holding
//! the full snapshot matrix. Two variants share the contract:
//!
//! - [`naive::NaiveSvd`] keeps an explicit orthonormal `U` and periodically
//!   re-orthogonalizes it.
//! - [`fast::FastUpdateSvd`] defers every rotation into a small replicated
//!   mixer `L`, so the effective left basis is `U·L` and the distributed
//!   columns are touched only when the rank grows.
//!
//! Snapshots are grouped into bounded time intervals; each interval owns a
//! fresh factorization and retired intervals stay readable.

use std::cell::OnceCell;

use anyhow::{anyhow, bail};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::comm::ProcessGroup;
use crate::linalg;
use crate::svd::SmallSvd;

pub mod fast;
pub mod naive;

pub use fast::FastUpdateSvd;
pub use naive::NaiveSvd;

/// Closed choice between the two kernel implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdVariant {
    Naive,
    FastUpdate,
}

/// What `take_sample` did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// First snapshot of a fresh time interval.
    Initial,
    /// The snapshot carried a new direction; the rank grew by one.
    New,
    /// The snapshot lies in the current column span; the singular values and
    /// the temporal basis absorbed it, the rank did not grow.
    Redundant,
    /// Nothing changed: the snapshot was zero, or it was redundant and
    /// redundant increments are being skipped.
    Skipped,
}

/// Counters for the orthogonality watchdog.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrthoStats {
    /// Gram-matrix deviation checks performed.
    pub checks: usize,
    /// Checks whose deviation exceeded the tolerance.
    pub violations: usize,
    /// Full re-orthogonalization passes applied (naive variant only).
    pub reorthogonalizations: usize,
}

/// Kernel configuration.
///
/// `dim` is the local row count on this process; everything else is
/// replicated policy and must match on every member of the group.
#[derive(Debug, Clone)]
pub struct SvdOptions {
    /// Rows of the state vector owned by this process.
    pub dim: usize,
    /// Redundancy tolerance: a snapshot whose post-projection residual norm
    /// falls below this is absorbed without growing the rank.
    pub epsilon: f64,
    /// If true, redundant snapshots are dropped entirely instead of being
    /// folded into the singular values and temporal basis.
    pub skip_redundant: bool,
    /// Bound on the number of snapshots per time interval.
    pub max_increments_per_interval: usize,
    /// Which kernel implementation to run.
    pub variant: SvdVariant,
    /// Retain the right singular vectors.
    pub update_right_sv: bool,
    /// Retain the raw snapshot matrix of each interval.
    pub retain_snapshots: bool,
    /// Orthogonality drift tolerance for the watchdog.
    pub orthogonality_tol: f64,
    /// Accepted new increments between watchdog checks; `None` checks every
    /// `r` accepted increments, where `r` is the current rank.
    pub reortho_interval: Option<usize>,
}

impl SvdOptions {
    pub fn new(dim: usize) -> Self {
        SvdOptions {
            dim,
            epsilon: 1e-12,
            skip_redundant: false,
            max_increments_per_interval: usize::MAX,
            variant: SvdVariant::FastUpdate,
            update_right_sv: false,
            retain_snapshots: false,
            orthogonality_tol: f64::EPSILON.sqrt(),
            reortho_interval: None,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dim == 0 {
            bail!("local dimension must be positive");
        }
        if !(self.epsilon > 0.0) {
            bail!("redundancy tolerance must be positive, got {}", self.epsilon);
        }
        if self.max_increments_per_interval == 0 {
            bail!("a time interval must hold at least one increment");
        }
        if !(self.orthogonality_tol > 0.0) {
            bail!(
                "orthogonality tolerance must be positive, got {}",
                self.orthogonality_tol
            );
        }
        if self.reortho_interval == Some(0) {
            bail!("re-orthogonalization interval must be positive");
        }
        Ok(())
    }
}

/// The factorization of one time interval.
///
/// `u` holds this process's row block; `s`, `v` and `l` are replicated.
pub(crate) struct Factorization {
    pub(crate) u: Array2<f64>,
    /// Fast-update mixer; the effective left basis is `u·l`. `None` in the
    /// naive variant, whose `u` carries every rotation directly.
    pub(crate) l: Option<Array2<f64>>,
    pub(crate) s: Array1<f64>,
    pub(crate) v: Option<Array2<f64>>,
    start_time: f64,
    sample_times: Vec<f64>,
    snapshot_cols: Option<Vec<Array1<f64>>>,
    snapshot_cache: OnceCell<Array2<f64>>,
}

impl Factorization {
    pub(crate) fn rank(&self) -> usize {
        self.s.len()
    }

    fn num_samples(&self) -> usize {
        self.sample_times.len()
    }

    /// `U` (naive) or `U·L` (fast), local rows.
    pub(crate) fn effective_basis(&self) -> Array2<f64> {
        match &self.l {
            Some(l) => self.u.dot(l),
            None => self.u.clone(),
        }
    }

    fn snapshot_matrix(&self) -> anyhow::Result<&Array2<f64>> {
        let cols = self
            .snapshot_cols
            .as_ref()
            .ok_or_else(|| anyhow!("snapshot retention is disabled"))?;
        Ok(self.snapshot_cache.get_or_init(|| {
            let mut m = Array2::zeros((self.u.nrows(), cols.len()));
            for (k, col) in cols.iter().enumerate() {
                m.column_mut(k).assign(col);
            }
            m
        }))
    }

    fn into_output(self) -> IntervalOutput {
        let basis = self.effective_basis();
        let snapshots = self.snapshot_cols.as_ref().map(|cols| {
            let mut m = Array2::zeros((self.u.nrows(), cols.len()));
            for (k, col) in cols.iter().enumerate() {
                m.column_mut(k).assign(col);
            }
            m
        });
        IntervalOutput {
            sample_times: self.sample_times,
            basis,
            singular_values: self.s,
            temporal_basis: self.v,
            snapshots,
        }
    }
}

/// Immutable output of a retired time interval.
pub(crate) struct IntervalOutput {
    sample_times: Vec<f64>,
    basis: Array2<f64>,
    singular_values: Array1<f64>,
    temporal_basis: Option<Array2<f64>>,
    snapshots: Option<Array2<f64>>,
}

impl IntervalOutput {
    pub fn sample_times(&self) -> &[f64] {
        &self.sample_times
    }

    /// Effective spatial basis, local rows.
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    pub fn temporal_basis(&self) -> Option<&Array2<f64>> {
        self.temporal_basis.as_ref()
    }

    pub fn snapshots(&self) -> Option<&Array2<f64>> {
        self.snapshots.as_ref()
    }
}

/// State and plumbing shared by both kernel variants.
pub(crate) struct Core<G: ProcessGroup> {
    comm: G,
    opts: SvdOptions,
    global_dim: usize,
    current: Option<Factorization>,
    retired: Vec<IntervalOutput>,
    start_times: Vec<f64>,
    norm_j: f64,
    revision: u64,
    accepted_since_check: usize,
    ortho_stats: OrthoStats,
    basis_cache: OnceCell<Array2<f64>>,
}

impl<G: ProcessGroup> Core<G> {
    pub(crate) fn new(comm: G, opts: SvdOptions) -> anyhow::Result<Self> {
        opts.validate()?;
        let global_dim = linalg::global_rows(opts.dim, &comm)?;
        Ok(Core {
            comm,
            opts,
            global_dim,
            current: None,
            retired: Vec::new(),
            start_times: Vec::new(),
            norm_j: 0.0,
            revision: 0,
            accepted_since_check: 0,
            ortho_stats: OrthoStats::default(),
            basis_cache: OnceCell::new(),
        })
    }

    pub(crate) fn comm(&self) -> &G {
        &self.comm
    }

    pub(crate) fn opts(&self) -> &SvdOptions {
        &self.opts
    }

    pub(crate) fn global_dim(&self) -> usize {
        self.global_dim
    }

    pub(crate) fn rank(&self) -> usize {
        self.current.as_ref().map_or(0, Factorization::rank)
    }

    pub(crate) fn residual_norm(&self) -> f64 {
        self.norm_j
    }

    pub(crate) fn set_residual_norm(&mut self, norm_j: f64) {
        self.norm_j = norm_j;
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn ortho_stats(&self) -> OrthoStats {
        self.ortho_stats
    }

    /// The rank may never exceed the global dimension; once it has, every
    /// further snapshot is treated as redundant.
    pub(crate) fn rank_saturated(&self) -> bool {
        self.rank() >= self.global_dim.min(self.opts.max_increments_per_interval)
    }

    pub(crate) fn validate_sample(&self, u: &[f64], time: f64) -> anyhow::Result<()> {
        if u.len() != self.opts.dim {
            bail!(
                "snapshot has {} local rows, this process owns {}",
                u.len(),
                self.opts.dim
            );
        }
        if !(time >= 0.0) {
            bail!("sample time must be non-negative, got {time}");
        }
        Ok(())
    }

    // ---- current interval ---------------------------------------------------

    pub(crate) fn current(&self) -> Option<&Factorization> {
        self.current.as_ref()
    }

    pub(crate) fn current_mut(&mut self) -> anyhow::Result<&mut Factorization> {
        self.current
            .as_mut()
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))
    }

    /// Effective spatial basis of the current interval, cached until the next
    /// mutation.
    pub(crate) fn spatial_basis(&self) -> anyhow::Result<&Array2<f64>> {
        let fact = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))?;
        Ok(self.basis_cache.get_or_init(|| fact.effective_basis()))
    }

    pub(crate) fn singular_values(&self) -> anyhow::Result<&Array1<f64>> {
        self.current
            .as_ref()
            .map(|fact| &fact.s)
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))
    }

    pub(crate) fn temporal_basis(&self) -> anyhow::Result<&Array2<f64>> {
        let fact = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))?;
        fact.v
            .as_ref()
            .ok_or_else(|| anyhow!("right singular vectors are not retained"))
    }

    pub(crate) fn snapshot_matrix(&self) -> anyhow::Result<&Array2<f64>> {
        let fact = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))?;
        fact.snapshot_matrix()
    }

    // ---- time intervals -----------------------------------------------------

    pub(crate) fn interval_count(&self) -> usize {
        self.retired.len() + usize::from(self.current.is_some())
    }

    pub(crate) fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    /// Index of the interval whose window contains `time`, i.e. the last
    /// interval starting at or before it.
    pub(crate) fn interval_for_time(&self, time: f64) -> Option<usize> {
        if self.start_times.is_empty() || time < self.start_times[0] {
            return None;
        }
        Some(self.start_times.partition_point(|&s| s <= time) - 1)
    }

    pub(crate) fn basis_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        if interval < self.retired.len() {
            return Ok(self.retired[interval].basis());
        }
        self.check_current_interval(interval)?;
        self.spatial_basis()
    }

    pub(crate) fn singular_values_at(&self, interval: usize) -> anyhow::Result<&Array1<f64>> {
        if interval < self.retired.len() {
            return Ok(self.retired[interval].singular_values());
        }
        self.check_current_interval(interval)?;
        self.singular_values()
    }

    pub(crate) fn temporal_basis_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        if interval < self.retired.len() {
            return self.retired[interval]
                .temporal_basis()
                .ok_or_else(|| anyhow!("right singular vectors are not retained"));
        }
        self.check_current_interval(interval)?;
        self.temporal_basis()
    }

    pub(crate) fn snapshots_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        if interval < self.retired.len() {
            return self.retired[interval]
                .snapshots()
                .ok_or_else(|| anyhow!("snapshot retention is disabled"));
        }
        self.check_current_interval(interval)?;
        self.snapshot_matrix()
    }

    pub(crate) fn sample_times_at(&self, interval: usize) -> anyhow::Result<&[f64]> {
        if interval < self.retired.len() {
            return Ok(self.retired[interval].sample_times());
        }
        self.check_current_interval(interval)?;
        Ok(self
            .current
            .as_ref()
            .map(|fact| fact.sample_times.as_slice())
            .unwrap_or(&[]))
    }

    fn check_current_interval(&self, interval: usize) -> anyhow::Result<()> {
        if interval == self.retired.len() && self.current.is_some() {
            Ok(())
        } else {
            bail!(
                "interval {interval} does not exist, {} recorded",
                self.interval_count()
            )
        }
    }

    /// Freezes the current interval if it has reached capacity.
    pub(crate) fn roll_interval_if_full(&mut self) {
        let full = self
            .current
            .as_ref()
            .is_some_and(|fact| fact.num_samples() >= self.opts.max_increments_per_interval);
        if full {
            self.freeze_current();
        }
    }

    /// Retires the current interval; the next snapshot starts a fresh one.
    pub(crate) fn freeze_current(&mut self) {
        if let Some(fact) = self.current.take() {
            log::debug!(
                "retiring time interval {} (t0={}) after {} samples at rank {}",
                self.retired.len(),
                fact.start_time,
                fact.num_samples(),
                fact.rank(),
            );
            self.retired.push(fact.into_output());
            self.basis_cache.take();
            self.revision += 1;
        }
    }

    // ---- shared kernel steps ------------------------------------------------

    /// Initial-SVD path: normalize the first snapshot of an interval.
    pub(crate) fn build_initial(
        &mut self,
        u_local: &[f64],
        time: f64,
        with_mixer: bool,
    ) -> anyhow::Result<SampleOutcome> {
        let u = ArrayView1::from(u_local);
        let norm = linalg::norm(u, &self.comm)?;
        if norm == 0.0 {
            return Ok(SampleOutcome::Skipped);
        }
        let col = u.to_owned() / norm;
        self.current = Some(Factorization {
            u: col.insert_axis(Axis(1)),
            l: with_mixer.then(|| Array2::eye(1)),
            s: Array1::from(vec![norm]),
            v: self.opts.update_right_sv.then(|| Array2::eye(1)),
            start_time: time,
            sample_times: Vec::new(),
            snapshot_cols: self.opts.retain_snapshots.then(Vec::new),
            snapshot_cache: OnceCell::new(),
        });
        self.start_times.push(time);
        self.norm_j = 0.0;
        self.accepted_since_check = 0;
        log::debug!("time interval {} starts at t={time}", self.start_times.len() - 1);
        self.finish_sample(u_local, time);
        Ok(SampleOutcome::Initial)
    }

    /// Projection and residual of a snapshot against the current basis, with
    /// one unconditional Gram-Schmidt correction pass against cancellation.
    ///
    /// Returns the replicated coordinates `ℓ`, the local residual `j`, and
    /// the collective residual norm.
    pub(crate) fn project_onto_basis(
        &self,
        u: ArrayView1<f64>,
    ) -> anyhow::Result<(Array1<f64>, Array1<f64>, f64)> {
        let basis = self.spatial_basis()?;
        let mut l = linalg::transposed_matvec(basis.view(), u, &self.comm)?;
        let mut j = u.to_owned();
        linalg::axpby(-1.0, basis.dot(&l).view(), 1.0, j.view_mut());
        let coarse = linalg::norm(j.view(), &self.comm)?;

        let dl = linalg::transposed_matvec(basis.view(), j.view(), &self.comm)?;
        linalg::axpby(-1.0, basis.dot(&dl).view(), 1.0, j.view_mut());
        l += &dl;
        let norm_j = linalg::norm(j.view(), &self.comm)?;
        if norm_j < 0.5 * coarse {
            log::debug!("correction pass shrank the residual from {coarse:.3e} to {norm_j:.3e}");
        }
        Ok((l, j, norm_j))
    }

    /// Records a sample that mutated the factorization: bumps the revision,
    /// drops caches, appends the time and (optionally) the raw snapshot.
    pub(crate) fn finish_sample(&mut self, u_local: &[f64], time: f64) {
        if let Some(fact) = self.current.as_mut() {
            fact.sample_times.push(time);
            if let Some(cols) = fact.snapshot_cols.as_mut() {
                cols.push(ArrayView1::from(u_local).to_owned());
                fact.snapshot_cache.take();
            }
        }
        self.basis_cache.take();
        self.revision += 1;
    }

    /// Whether the orthogonality watchdog should run after this accepted
    /// increment.
    pub(crate) fn ortho_check_due(&mut self) -> bool {
        self.accepted_since_check += 1;
        let cadence = self
            .opts
            .reortho_interval
            .unwrap_or_else(|| self.rank().max(1));
        if self.accepted_since_check >= cadence {
            self.accepted_since_check = 0;
            true
        } else {
            false
        }
    }

    /// Collective `‖BᵀB − I‖_max` of the effective basis.
    pub(crate) fn orthogonality_deviation(&mut self) -> anyhow::Result<f64> {
        let basis = self.spatial_basis()?;
        let g = linalg::gram(basis.view(), &self.comm)?;
        let mut dev: f64 = 0.0;
        for ((i, j), x) in g.indexed_iter() {
            let target = if i == j { 1.0 } else { 0.0 };
            dev = dev.max((x - target).abs());
        }
        self.ortho_stats.checks += 1;
        if dev > self.opts.orthogonality_tol {
            self.ortho_stats.violations += 1;
        }
        Ok(dev)
    }

    pub(crate) fn note_reorthogonalization(&mut self) {
        self.ortho_stats.reorthogonalizations += 1;
    }

    /// Distributed modified Gram-Schmidt on the columns of `U`, with the
    /// triangular correction pushed back through `Σ` and `V` so the
    /// factorization still reproduces the same snapshot matrix.
    pub(crate) fn reorthogonalize_left(&mut self) -> anyhow::Result<()> {
        let comm = &self.comm;
        let fact = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))?;
        let r = fact.rank();
        let mut rmat = Array2::zeros((r, r));
        for k in 0..r {
            let nk = linalg::norm(fact.u.column(k), comm)?;
            if nk == 0.0 {
                bail!("basis column {k} collapsed to zero during re-orthogonalization");
            }
            rmat[[k, k]] = nk;
            fact.u.column_mut(k).mapv_inplace(|x| x / nk);
            if k + 1 < r {
                let (head, mut tail) = fact.u.view_mut().split_at(Axis(1), k + 1);
                let qk = head.column(k);
                let coeffs = linalg::transposed_matvec(tail.view(), qk, comm)?;
                for (i, &c) in coeffs.iter().enumerate() {
                    rmat[[k, k + 1 + i]] = c;
                    tail.column_mut(i).scaled_add(-c, &qk);
                }
            }
        }

        // U_old = Q·R, so rotating by the SVD of R·Σ restores a diagonal
        // middle factor without moving the reconstruction.
        let m = rmat.dot(&Array2::from_diag(&fact.s));
        let svd = SmallSvd::new(&m.view())?;
        fact.u = fact.u.dot(svd.u());
        fact.s = svd.s().clone();
        if let Some(v) = fact.v.take() {
            fact.v = Some(v.dot(svd.v()));
        }
        self.basis_cache.take();
        self.revision += 1;
        Ok(())
    }
}

/// The augmented matrix whose SVD advances the factorization:
/// `[[diag(s), l], [0ᵀ, corner]]`, sized `(r+1) x (r+1)`.
pub(crate) fn construct_q(s: &Array1<f64>, l: &Array1<f64>, corner: f64) -> Array2<f64> {
    let r = s.len();
    let mut q = Array2::zeros((r + 1, r + 1));
    for i in 0..r {
        q[[i, i]] = s[i];
        q[[i, r]] = l[i];
    }
    q[[r, r]] = corner;
    q
}

/// The block-bordered extension `[[M, 0], [0ᵀ, 1]]` used to grow `L` and
/// `V` by one row and column.
pub(crate) fn bordered(m: &ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = m.dim();
    let mut out = Array2::zeros((rows + 1, cols + 1));
    out.slice_mut(ndarray::s![..rows, ..cols]).assign(m);
    out[[rows, cols]] = 1.0;
    out
}

/// Dispatcher over the two kernel implementations. The choice is closed:
/// callers pick a [`SvdVariant`] and the facade never sees the difference.
pub(crate) enum Kernel<G: ProcessGroup> {
    Naive(NaiveSvd<G>),
    Fast(FastUpdateSvd<G>),
}

impl<G: ProcessGroup> Kernel<G> {
    pub(crate) fn new(comm: G, opts: SvdOptions) -> anyhow::Result<Self> {
        match opts.variant {
            SvdVariant::Naive => Ok(Kernel::Naive(NaiveSvd::new(comm, opts)?)),
            SvdVariant::FastUpdate => Ok(Kernel::Fast(FastUpdateSvd::new(comm, opts)?)),
        }
    }

    pub(crate) fn take_sample(&mut self, u: &[f64], time: f64) -> anyhow::Result<SampleOutcome> {
        match self {
            Kernel::Naive(kernel) => kernel.take_sample(u, time),
            Kernel::Fast(kernel) => kernel.take_sample(u, time),
        }
    }

    pub(crate) fn core(&self) -> &Core<G> {
        match self {
            Kernel::Naive(kernel) => kernel.core(),
            Kernel::Fast(kernel) => kernel.core(),
        }
    }

    pub(crate) fn core_mut(&mut self) -> &mut Core<G> {
        match self {
            Kernel::Naive(kernel) => kernel.core_mut(),
            Kernel::Fast(kernel) => kernel.core_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialGroup;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn options_reject_bad_parameters() {
        assert!(SvdOptions::new(0).validate().is_err());

        let mut opts = SvdOptions::new(4);
        assert!(opts.validate().is_ok());

        opts.epsilon = 0.0;
        assert!(opts.validate().is_err());
        opts.epsilon = f64::NAN;
        assert!(opts.validate().is_err());
        opts.epsilon = 1e-10;

        opts.max_increments_per_interval = 0;
        assert!(opts.validate().is_err());
        opts.max_increments_per_interval = 8;

        opts.reortho_interval = Some(0);
        assert!(opts.validate().is_err());
        opts.reortho_interval = Some(4);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn construct_q_layout() {
        let s = array![3.0, 1.0];
        let l = array![0.5, -0.25];
        let q = construct_q(&s, &l, 2.0);
        assert_eq!(q.shape(), &[3, 3]);
        assert_abs_diff_eq!(q[[0, 0]], 3.0);
        assert_abs_diff_eq!(q[[1, 1]], 1.0);
        assert_abs_diff_eq!(q[[0, 2]], 0.5);
        assert_abs_diff_eq!(q[[1, 2]], -0.25);
        assert_abs_diff_eq!(q[[2, 2]], 2.0);
        assert_abs_diff_eq!(q[[2, 0]], 0.0);
        assert_abs_diff_eq!(q[[1, 0]], 0.0);
    }

    #[test]
    fn bordered_extends_by_identity() {
        let m = array![[1.0, 2.0], [3.0, 4.0]];
        let b = bordered(&m.view());
        assert_eq!(b.shape(), &[3, 3]);
        assert_abs_diff_eq!(b[[0, 1]], 2.0);
        assert_abs_diff_eq!(b[[2, 2]], 1.0);
        assert_abs_diff_eq!(b[[2, 0]], 0.0);
        assert_abs_diff_eq!(b[[0, 2]], 0.0);
    }

    #[test]
    fn interval_lookup_by_time() {
        let mut core = Core::new(SerialGroup, SvdOptions::new(2)).unwrap();
        core.start_times = vec![0.0, 1.0, 2.5];
        assert_eq!(core.interval_for_time(-0.5), None);
        assert_eq!(core.interval_for_time(0.0), Some(0));
        assert_eq!(core.interval_for_time(0.99), Some(0));
        assert_eq!(core.interval_for_time(1.0), Some(1));
        assert_eq!(core.interval_for_time(7.0), Some(2));
    }

    #[test]
    fn accessors_before_first_sample_fail() {
        let core = Core::new(SerialGroup, SvdOptions::new(3)).unwrap();
        assert!(core.spatial_basis().is_err());
        assert!(core.singular_values().is_err());
        assert!(core.temporal_basis().is_err());
        assert_eq!(core.interval_count(), 0);
        assert_eq!(core.rank(), 0);
    }
}
