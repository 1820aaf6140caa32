//! Naive incremental SVD: the left basis is kept explicit and every rotation
//! from the augmented SVD is applied to the distributed columns immediately.
//! Algebraically equivalent to the fast-update variant but touches `O(d·r)`
//! data per snapshot, so it relies on a periodic re-orthogonalization pass to
//! keep rounding drift out of the basis.

use ndarray::{s, Array2, ArrayView1};

use crate::comm::ProcessGroup;
use crate::svd::SmallSvd;

use super::{bordered, construct_q, Core, Factorization, SampleOutcome, SvdOptions, SvdVariant};

pub struct NaiveSvd<G: ProcessGroup> {
    core: Core<G>,
}

impl<G: ProcessGroup> NaiveSvd<G> {
    pub fn new(comm: G, mut opts: SvdOptions) -> anyhow::Result<Self> {
        opts.variant = SvdVariant::Naive;
        Ok(NaiveSvd {
            core: Core::new(comm, opts)?,
        })
    }

    /// Absorb one snapshot taken at `time`. Collective: every member of the
    /// group must call this with its own row block of the same global state.
    pub fn take_sample(&mut self, u_local: &[f64], time: f64) -> anyhow::Result<SampleOutcome> {
        self.core.validate_sample(u_local, time)?;
        self.core.roll_interval_if_full();
        if self.core.current().is_none() {
            return self.core.build_initial(u_local, time, false);
        }

        let u = ArrayView1::from(u_local);
        let (l, j, norm_j) = self.core.project_onto_basis(u)?;
        self.core.set_residual_norm(norm_j);
        if norm_j == 0.0 && l.iter().all(|&c| c == 0.0) {
            // zero snapshot: nothing to learn, nothing to record
            return Ok(SampleOutcome::Skipped);
        }

        let redundant = norm_j < self.core.opts().epsilon || self.core.rank_saturated();
        if redundant && self.core.opts().skip_redundant {
            return Ok(SampleOutcome::Skipped);
        }

        let corner = if redundant { 0.0 } else { norm_j };
        let q = construct_q(self.core.singular_values()?, &l, corner);
        let svd = SmallSvd::new(&q.view())?;

        let outcome = if redundant {
            apply_redundant(self.core.current_mut()?, &svd);
            SampleOutcome::Redundant
        } else {
            let jq = j / norm_j;
            apply_new(self.core.current_mut()?, jq.view(), &svd);
            SampleOutcome::New
        };
        self.core.finish_sample(u_local, time);

        if outcome == SampleOutcome::New && self.core.ortho_check_due() {
            let deviation = self.core.orthogonality_deviation()?;
            if deviation > self.core.opts().orthogonality_tol {
                log::debug!(
                    "left basis drifted to {deviation:.3e} from orthonormality, re-orthogonalizing"
                );
                self.core.reorthogonalize_left()?;
                self.core.note_reorthogonalization();
            }
        }
        Ok(outcome)
    }

    /// The current left basis, cached until the next mutation.
    pub fn basis(&self) -> anyhow::Result<&Array2<f64>> {
        self.core.spatial_basis()
    }

    pub fn singular_values(&self) -> anyhow::Result<&ndarray::Array1<f64>> {
        self.core.singular_values()
    }

    pub fn temporal_basis(&self) -> anyhow::Result<&Array2<f64>> {
        self.core.temporal_basis()
    }

    pub fn rank(&self) -> usize {
        self.core.rank()
    }

    pub fn residual_norm(&self) -> f64 {
        self.core.residual_norm()
    }

    pub(crate) fn core(&self) -> &Core<G> {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut Core<G> {
        &mut self.core
    }
}

/// Rank grows: append the normalized residual and rotate the whole left
/// basis by the augmented SVD's left factor, keeping `U` canonical.
fn apply_new(fact: &mut Factorization, jq: ArrayView1<f64>, svd: &SmallSvd) {
    let (d, r) = fact.u.dim();
    let mut u_ext = Array2::zeros((d, r + 1));
    u_ext.slice_mut(s![.., ..r]).assign(&fact.u);
    u_ext.column_mut(r).assign(&jq);
    fact.u = u_ext.dot(svd.u());
    fact.s = svd.s().clone();
    if let Some(v) = fact.v.take() {
        fact.v = Some(bordered(&v.view()).dot(svd.v()));
    }
}

/// Rank holds: the snapshot's energy is folded into the singular values by
/// the leading `r x r` block of the rotation; the basis is rotated in place.
fn apply_redundant(fact: &mut Factorization, svd: &SmallSvd) {
    let r = fact.rank();
    fact.u = fact.u.dot(&svd.u().slice(s![..r, ..r]));
    fact.s = svd.s().slice(s![..r]).to_owned();
    if let Some(v) = fact.v.take() {
        fact.v = Some(bordered(&v.view()).dot(&svd.v().slice(s![.., ..r])));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialGroup;
    use crate::linalg;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn options(dim: usize) -> SvdOptions {
        let mut opts = SvdOptions::new(dim);
        opts.update_right_sv = true;
        opts
    }

    #[test]
    fn single_snapshot_builds_rank_one_factorization() {
        let mut kernel = NaiveSvd::new(SerialGroup, options(4)).unwrap();
        let outcome = kernel.take_sample(&[1.0, 2.0, 2.0, 0.0], 0.0).unwrap();
        assert_eq!(outcome, SampleOutcome::Initial);
        assert_eq!(kernel.rank(), 1);

        let s = kernel.singular_values().unwrap();
        assert_abs_diff_eq!(s[0], 3.0, epsilon = 1e-15);

        let basis = kernel.basis().unwrap();
        let expected = [1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0, 0.0];
        for (i, &x) in expected.iter().enumerate() {
            assert_abs_diff_eq!(basis[[i, 0]], x, epsilon = 1e-15);
        }

        let v = kernel.temporal_basis().unwrap();
        assert_eq!(v.shape(), &[1, 1]);
        assert_abs_diff_eq!(v[[0, 0]], 1.0);
    }

    #[test]
    fn orthogonal_snapshots_grow_the_rank() {
        let mut opts = options(3);
        opts.epsilon = 1e-12;
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();
        kernel.take_sample(&[1.0, 0.0, 0.0], 0.0).unwrap();
        let outcome = kernel.take_sample(&[0.0, 1.0, 0.0], 1.0).unwrap();
        assert_eq!(outcome, SampleOutcome::New);
        assert_eq!(kernel.rank(), 2);

        let s = kernel.singular_values().unwrap();
        assert_abs_diff_eq!(s[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s[1], 1.0, epsilon = 1e-12);

        // span must be {e1, e2}: the projector is diag(1, 1, 0)
        let basis = kernel.basis().unwrap();
        let projector = basis.dot(&basis.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j && i < 2 { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(projector[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn exact_repeat_is_redundant() {
        let mut opts = options(4);
        opts.skip_redundant = true;
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();

        let u = [0.5, 0.5, 0.5, 0.5];
        kernel.take_sample(&u, 0.0).unwrap();
        let sigma_before = kernel.singular_values().unwrap().clone();
        let basis_before = kernel.basis().unwrap().clone();

        let outcome = kernel.take_sample(&u, 1.0).unwrap();
        assert_eq!(outcome, SampleOutcome::Skipped);
        assert_eq!(kernel.rank(), 1);

        let sigma_after = kernel.singular_values().unwrap();
        assert_abs_diff_eq!(sigma_after[0], sigma_before[0], epsilon = 1e-14);
        let basis_after = kernel.basis().unwrap();
        for (&x, &y) in basis_before.iter().zip(basis_after.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-14);
        }
    }

    #[test]
    fn absorbed_repeat_keeps_the_basis_and_grows_sigma() {
        let mut kernel = NaiveSvd::new(SerialGroup, options(4)).unwrap();
        let u = [0.5, 0.5, 0.5, 0.5];
        kernel.take_sample(&u, 0.0).unwrap();
        let basis_before = kernel.basis().unwrap().clone();

        let outcome = kernel.take_sample(&u, 1.0).unwrap();
        assert_eq!(outcome, SampleOutcome::Redundant);
        assert_eq!(kernel.rank(), 1);

        // two copies of a unit vector have singular value sqrt(2)
        let sigma = kernel.singular_values().unwrap();
        assert_abs_diff_eq!(sigma[0], 2f64.sqrt(), epsilon = 1e-12);

        // compare projectors so an overall sign flip of the rotation cannot
        // fail the test
        let basis_after = kernel.basis().unwrap();
        let before = basis_before.dot(&basis_before.t());
        let after = basis_after.dot(&basis_after.t());
        for (&x, &y) in before.iter().zip(after.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }

        // the temporal basis picked up the duplicate column
        assert_eq!(kernel.temporal_basis().unwrap().shape(), &[2, 1]);
    }

    #[test]
    fn near_collinear_snapshot_is_redundant() {
        let mut opts = options(2);
        opts.epsilon = 1e-10;
        opts.skip_redundant = true;
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();

        kernel.take_sample(&[1.0, 0.0], 0.0).unwrap();
        let outcome = kernel.take_sample(&[1.0, 1e-15], 1.0).unwrap();
        assert_eq!(outcome, SampleOutcome::Skipped);
        assert_eq!(kernel.rank(), 1);
        assert!(kernel.residual_norm() < 1e-10);
    }

    #[test]
    fn interval_rollover_partitions_the_stream() {
        let mut opts = options(6);
        opts.max_increments_per_interval = 3;
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let snapshots: Vec<Vec<f64>> = (0..7)
            .map(|_| (0..6).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        for (step, u) in snapshots.iter().enumerate() {
            kernel.take_sample(u, step as f64).unwrap();
        }

        let core = kernel.core();
        assert_eq!(core.interval_count(), 3);
        assert_eq!(core.sample_times_at(0).unwrap().len(), 3);
        assert_eq!(core.sample_times_at(1).unwrap().len(), 3);
        assert_eq!(core.sample_times_at(2).unwrap().len(), 1);

        let starts = core.start_times();
        assert_eq!(starts, &[0.0, 3.0, 6.0]);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));

        // the retired factorizations are independent of the current one
        assert_eq!(core.singular_values_at(0).unwrap().len(), 3);
        assert_eq!(core.singular_values_at(2).unwrap().len(), 1);
        assert_eq!(kernel.rank(), 1);

        // an interval's factorization depends only on its own snapshots: a
        // fresh kernel fed just the second batch reproduces it exactly
        let mut fresh = NaiveSvd::new(SerialGroup, options(6)).unwrap();
        for (step, u) in snapshots[3..6].iter().enumerate() {
            fresh.take_sample(u, (step + 3) as f64).unwrap();
        }
        let replay = fresh.singular_values().unwrap();
        let original = core.singular_values_at(1).unwrap();
        for (x, y) in replay.iter().zip(original.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn basis_stays_orthonormal_over_a_long_stream() {
        let mut opts = options(12);
        opts.reortho_interval = Some(2);
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let mut previous_rank = 0;
        for step in 0..20 {
            let u: Vec<f64> = (0..12).map(|_| rng.random_range(-1.0..1.0)).collect();
            kernel.take_sample(&u, step as f64).unwrap();

            let s = kernel.singular_values().unwrap();
            assert!(s.windows(2).into_iter().all(|w| w[0] >= w[1]));
            assert!(s.iter().all(|&x| x >= 0.0));
            assert!(kernel.rank() >= previous_rank);
            previous_rank = kernel.rank();

            let basis = kernel.basis().unwrap();
            let g = linalg::gram(basis.view(), &SerialGroup).unwrap();
            for i in 0..kernel.rank() {
                for j in 0..kernel.rank() {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_abs_diff_eq!(g[[i, j]], expected, epsilon = 1e-7);
                }
            }
        }
        assert_eq!(kernel.rank(), 12);

        // rank is capped by the global dimension
        let mut rng = StdRng::seed_from_u64(8);
        let u: Vec<f64> = (0..12).map(|_| rng.random_range(-1.0..1.0)).collect();
        let outcome = kernel.take_sample(&u, 20.0).unwrap();
        assert_eq!(outcome, SampleOutcome::Redundant);
        assert_eq!(kernel.rank(), 12);
    }

    #[test]
    fn factorization_reconstructs_the_snapshot_matrix() {
        let mut opts = options(8);
        opts.retain_snapshots = true;
        let mut kernel = NaiveSvd::new(SerialGroup, opts).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        for step in 0..5 {
            let u: Vec<f64> = (0..8).map(|_| rng.random_range(-2.0..2.0)).collect();
            kernel.take_sample(&u, step as f64).unwrap();
        }

        let snapshots = kernel.core().snapshot_matrix().unwrap().clone();
        let basis = kernel.basis().unwrap();
        let s_diag = Array2::from_diag(kernel.singular_values().unwrap());
        let v = kernel.temporal_basis().unwrap();
        let reconstructed = basis.dot(&s_diag).dot(&v.t());

        let err = (&reconstructed - &snapshots).mapv(|x| x * x).sum().sqrt();
        let scale = snapshots.mapv(|x| x * x).sum().sqrt();
        assert!(err / scale < 1e-10, "relative error {}", err / scale);
    }

    #[test]
    fn zero_snapshot_is_skipped() {
        let mut kernel = NaiveSvd::new(SerialGroup, options(3)).unwrap();
        assert_eq!(
            kernel.take_sample(&[0.0, 0.0, 0.0], 0.0).unwrap(),
            SampleOutcome::Skipped
        );
        assert_eq!(kernel.rank(), 0);

        kernel.take_sample(&[1.0, 1.0, 0.0], 1.0).unwrap();
        let before = kernel.singular_values().unwrap().clone();
        assert_eq!(
            kernel.take_sample(&[0.0, 0.0, 0.0], 2.0).unwrap(),
            SampleOutcome::Skipped
        );
        assert_eq!(kernel.singular_values().unwrap(), &before);
    }

    #[test]
    fn sample_preconditions_are_enforced() {
        let mut kernel = NaiveSvd::new(SerialGroup, options(3)).unwrap();
        assert!(kernel.take_sample(&[1.0, 2.0], 0.0).is_err());
        assert!(kernel.take_sample(&[1.0, 2.0, 3.0], -1.0).is_err());
        assert!(kernel.take_sample(&[1.0, 2.0, 3.0], f64::NAN).is_err());
    }
}
