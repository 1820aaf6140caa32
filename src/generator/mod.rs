//! # Basis Generator Facade
//!
//! The single entry point application drivers talk to. It owns one kernel
//! behind the variant selector, feeds it timestamped snapshots, and exposes
//! the factorization of the current and all retired time intervals through
//! read-only accessors shaped the way the external basis writer consumes
//! them (row-major blocks plus explicit dimensions).

use ndarray::{Array1, Array2};

use crate::comm::{ProcessGroup, SerialGroup};
use crate::incremental::{Kernel, OrthoStats, SampleOutcome, SvdOptions, SvdVariant};

/// Builder for a [`BasisGenerator`], with the defaults of [`SvdOptions`].
///
/// # Example Usage
/// ```ignore
/// let generator = BasisGenerator::builder(local_rows)
///     .epsilon(1e-8)
///     .variant(SvdVariant::FastUpdate)
///     .max_increments_per_interval(200)
///     .update_right_sv(true)
///     .build()?;
/// ```
pub struct BasisGeneratorBuilder<G: ProcessGroup = SerialGroup> {
    comm: G,
    opts: SvdOptions,
}

impl BasisGeneratorBuilder<SerialGroup> {
    pub fn new(dim: usize) -> Self {
        BasisGeneratorBuilder {
            comm: SerialGroup,
            opts: SvdOptions::new(dim),
        }
    }
}

impl<G: ProcessGroup> BasisGeneratorBuilder<G> {
    /// Replaces the transport. Rank and size are captured from it when the
    /// generator is built.
    pub fn comm<H: ProcessGroup>(self, comm: H) -> BasisGeneratorBuilder<H> {
        BasisGeneratorBuilder {
            comm,
            opts: self.opts,
        }
    }

    /// Redundancy tolerance for the residual-norm decision.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.opts.epsilon = epsilon;
        self
    }

    /// Drop redundant snapshots instead of folding them into the
    /// factorization.
    pub fn skip_redundant(mut self, skip: bool) -> Self {
        self.opts.skip_redundant = skip;
        self
    }

    /// Bound on the number of snapshots per time interval.
    pub fn max_increments_per_interval(mut self, max_increments: usize) -> Self {
        self.opts.max_increments_per_interval = max_increments;
        self
    }

    /// Which kernel implementation to run.
    pub fn variant(mut self, variant: SvdVariant) -> Self {
        self.opts.variant = variant;
        self
    }

    /// Retain the right singular vectors.
    pub fn update_right_sv(mut self, update: bool) -> Self {
        self.opts.update_right_sv = update;
        self
    }

    /// Retain the raw snapshot matrix of each interval.
    pub fn retain_snapshots(mut self, retain: bool) -> Self {
        self.opts.retain_snapshots = retain;
        self
    }

    /// Orthogonality drift tolerance for the watchdog.
    pub fn orthogonality_tol(mut self, tol: f64) -> Self {
        self.opts.orthogonality_tol = tol;
        self
    }

    /// Check orthogonality every `every` accepted new increments instead of
    /// every `r`.
    pub fn reortho_interval(mut self, every: usize) -> Self {
        self.opts.reortho_interval = Some(every);
        self
    }

    pub fn build(self) -> anyhow::Result<BasisGenerator<G>> {
        Ok(BasisGenerator {
            kernel: Kernel::new(self.comm, self.opts)?,
        })
    }
}

/// Streams snapshots into an incremental SVD and hands out the resulting
/// reduced bases.
///
/// All mutating operations and `build` are collective over the process
/// group; read-only accessors return borrowed views that stay valid until
/// the next mutating call.
pub struct BasisGenerator<G: ProcessGroup = SerialGroup> {
    kernel: Kernel<G>,
}

impl BasisGenerator<SerialGroup> {
    pub fn builder(dim: usize) -> BasisGeneratorBuilder<SerialGroup> {
        BasisGeneratorBuilder::new(dim)
    }
}

impl<G: ProcessGroup> BasisGenerator<G> {
    /// Subsampling hook: whether the caller should bother computing the
    /// snapshot for `time`. This implementation always wants the sample;
    /// callers may substitute their own policy and skip when it says no.
    pub fn is_next_sample_needed(&self, _time: f64) -> bool {
        true
    }

    /// Absorb one snapshot (this process's row block) taken at `time`.
    pub fn take_sample(&mut self, u_local: &[f64], time: f64) -> anyhow::Result<SampleOutcome> {
        self.kernel.take_sample(u_local, time)
    }

    /// Freeze the current time interval; the next snapshot starts a new one.
    pub fn advance_interval(&mut self) {
        self.kernel.core_mut().freeze_current();
    }

    /// The spatial basis of the current interval, local rows.
    pub fn spatial_basis(&self) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().spatial_basis()
    }

    /// The temporal basis of the current interval; requires
    /// `update_right_sv`.
    pub fn temporal_basis(&self) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().temporal_basis()
    }

    /// The singular values of the current interval.
    pub fn singular_values(&self) -> anyhow::Result<&Array1<f64>> {
        self.kernel.core().singular_values()
    }

    /// The retained snapshot matrix of the current interval, local rows;
    /// requires `retain_snapshots`. Materialized lazily.
    pub fn snapshot_matrix(&self) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().snapshot_matrix()
    }

    // ---- time intervals -----------------------------------------------------

    pub fn interval_count(&self) -> usize {
        self.kernel.core().interval_count()
    }

    /// Start time of every interval seen so far, in order.
    pub fn interval_start_times(&self) -> &[f64] {
        self.kernel.core().start_times()
    }

    /// Index of the interval whose window contains `time`.
    pub fn interval_for_time(&self, time: f64) -> Option<usize> {
        self.kernel.core().interval_for_time(time)
    }

    pub fn basis_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().basis_at(interval)
    }

    pub fn singular_values_at(&self, interval: usize) -> anyhow::Result<&Array1<f64>> {
        self.kernel.core().singular_values_at(interval)
    }

    pub fn temporal_basis_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().temporal_basis_at(interval)
    }

    pub fn snapshots_at(&self, interval: usize) -> anyhow::Result<&Array2<f64>> {
        self.kernel.core().snapshots_at(interval)
    }

    pub fn sample_times_at(&self, interval: usize) -> anyhow::Result<&[f64]> {
        self.kernel.core().sample_times_at(interval)
    }

    // ---- introspection ------------------------------------------------------

    /// Local rows owned by this process.
    pub fn dim(&self) -> usize {
        self.kernel.core().opts().dim
    }

    /// Total rows across the process group.
    pub fn global_dim(&self) -> usize {
        self.kernel.core().global_dim()
    }

    pub fn epsilon(&self) -> f64 {
        self.kernel.core().opts().epsilon
    }

    pub fn variant(&self) -> SvdVariant {
        self.kernel.core().opts().variant
    }

    pub fn update_right_sv(&self) -> bool {
        self.kernel.core().opts().update_right_sv
    }

    pub fn rank(&self) -> usize {
        self.kernel.core().rank()
    }

    /// Residual norm of the most recently projected snapshot.
    pub fn residual_norm(&self) -> f64 {
        self.kernel.core().residual_norm()
    }

    pub fn comm_rank(&self) -> usize {
        self.kernel.core().comm().rank()
    }

    pub fn comm_size(&self) -> usize {
        self.kernel.core().comm().size()
    }

    /// Bumped on every mutation of the factorization; downstream caches key
    /// on it.
    pub fn revision(&self) -> u64 {
        self.kernel.core().revision()
    }

    pub fn ortho_stats(&self) -> OrthoStats {
        self.kernel.core().ortho_stats()
    }
}
