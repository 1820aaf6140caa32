//! Fast-update incremental SVD: rotations from the augmented SVD accumulate
//! in a small replicated mixer `L` instead of being applied to the
//! distributed columns, so the effective left basis is `U·L`. `U` itself is
//! only touched when the rank grows, and orthonormality of `U·L` holds
//! algebraically, with no re-orthogonalization pass.

use ndarray::{s, Array1, Array2, ArrayView1};

use crate::comm::ProcessGroup;
use crate::svd::SmallSvd;

use super::{bordered, construct_q, Core, Factorization, SampleOutcome, SvdOptions, SvdVariant};

pub struct FastUpdateSvd<G: ProcessGroup> {
    core: Core<G>,
}

impl<G: ProcessGroup> FastUpdateSvd<G> {
    pub fn new(comm: G, mut opts: SvdOptions) -> anyhow::Result<Self> {
        opts.variant = SvdVariant::FastUpdate;
        Ok(FastUpdateSvd {
            core: Core::new(comm, opts)?,
        })
    }

    /// Absorb one snapshot taken at `time`. Collective: every member of the
    /// group must call this with its own row block of the same global state.
    pub fn take_sample(&mut self, u_local: &[f64], time: f64) -> anyhow::Result<SampleOutcome> {
        self.core.validate_sample(u_local, time)?;
        self.core.roll_interval_if_full();
        if self.core.current().is_none() {
            return self.core.build_initial(u_local, time, true);
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
            apply_redundant(self.core.current_mut()?, &svd)?;
            SampleOutcome::Redundant
        } else {
            let jq = j / norm_j;
            apply_new(self.core.current_mut()?, jq.view(), &svd)?;
            SampleOutcome::New
        };
        self.core.finish_sample(u_local, time);

        if outcome == SampleOutcome::New && self.core.ortho_check_due() {
            let deviation = self.core.orthogonality_deviation()?;
            if deviation > self.core.opts().orthogonality_tol {
                // the mixer keeps this orthonormal in exact arithmetic, so
                // drift here is worth surfacing but never repaired
                log::warn!("effective basis drifted to {deviation:.3e} from orthonormality");
            }
        }
        Ok(outcome)
    }

    /// The current effective left basis `U·L`, combined lazily and cached
    /// until the next mutation.
    pub fn basis(&self) -> anyhow::Result<&Array2<f64>> {
        self.core.spatial_basis()
    }

    pub fn singular_values(&self) -> anyhow::Result<&Array1<f64>> {
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

/// Rank grows: append the normalized residual to `U` untouched and defer the
/// rotation into the bordered mixer.
fn apply_new(
    fact: &mut Factorization,
    jq: ArrayView1<f64>,
    svd: &SmallSvd,
) -> anyhow::Result<()> {
    let (d, r) = fact.u.dim();
    let mut u_ext = Array2::zeros((d, r + 1));
    u_ext.slice_mut(s![.., ..r]).assign(&fact.u);
    u_ext.column_mut(r).assign(&jq);
    fact.u = u_ext;

    let l = take_mixer(fact)?;
    fact.l = Some(bordered(&l.view()).dot(svd.u()));
    fact.s = svd.s().clone();
    if let Some(v) = fact.v.take() {
        fact.v = Some(bordered(&v.view()).dot(svd.v()));
    }
    Ok(())
}

/// Rank holds: only the replicated factors move; the distributed columns are
/// not touched at all.
fn apply_redundant(fact: &mut Factorization, svd: &SmallSvd) -> anyhow::Result<()> {
    let r = fact.rank();
    let l = take_mixer(fact)?;
    fact.l = Some(l.dot(&svd.u().slice(s![..r, ..r])));
    fact.s = svd.s().slice(s![..r]).to_owned();
    if let Some(v) = fact.v.take() {
        fact.v = Some(bordered(&v.view()).dot(&svd.v().slice(s![.., ..r])));
    }
    Ok(())
}

fn take_mixer(fact: &mut Factorization) -> anyhow::Result<Array2<f64>> {
    fact.l
        .take()
        .ok_or_else(|| anyhow::anyhow!("fast-update factorization lost its mixer"))
}
