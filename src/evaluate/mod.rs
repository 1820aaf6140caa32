//! # Reduced Model Evaluator
//!
//! Turns the retained factorization back into (approximate) full-space
//! state: pick the time interval covering a query time, take the right
//! singular vector of the sample nearest to it, and expand `U·Σ·v` over the
//! local rows. Purely local, no collectives. DMD-style consumers can hand in
//! their own reduced coordinates instead.

use std::cell::RefCell;
use std::cmp::Ordering;

use anyhow::{anyhow, bail};
use ndarray::{Array1, ArrayView1};

use crate::comm::ProcessGroup;
use crate::generator::BasisGenerator;

/// Stateless except for a cache of the most recent evaluation, keyed on the
/// generator's revision so any mutation of the factorization invalidates it.
#[derive(Default)]
pub struct ReducedModelEvaluator {
    cache: RefCell<Option<CachedState>>,
}

struct CachedState {
    revision: u64,
    time: f64,
    state: Array1<f64>,
}

impl ReducedModelEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local rows of `U·Σ·v(t)` where `v(t)` is the retained right singular
    /// vector of the sample nearest `time` within the interval covering it.
    pub fn evaluate<G: ProcessGroup>(
        &self,
        generator: &BasisGenerator<G>,
        time: f64,
    ) -> anyhow::Result<Array1<f64>> {
        if !(time >= 0.0) {
            bail!("evaluation time must be non-negative, got {time}");
        }
        if let Some(cached) = &*self.cache.borrow() {
            if cached.revision == generator.revision() && cached.time == time {
                return Ok(cached.state.clone());
            }
        }

        let interval = generator
            .interval_for_time(time)
            .ok_or_else(|| anyhow!("no time interval covers t={time}"))?;
        let times = generator.sample_times_at(interval)?;
        let (nearest, _) = times
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - time)
                    .abs()
                    .partial_cmp(&(*b - time).abs())
                    .unwrap_or(Ordering::Equal)
            })
            .ok_or_else(|| anyhow!("interval {interval} holds no samples"))?;

        let v = generator.temporal_basis_at(interval)?;
        let state = expand(generator, interval, v.row(nearest))?;
        self.cache.replace(Some(CachedState {
            revision: generator.revision(),
            time,
            state: state.clone(),
        }));
        Ok(state)
    }

    /// Local rows of `U·Σ·v` for externally supplied reduced coordinates
    /// `v` against the current interval's factorization.
    pub fn reconstruct<G: ProcessGroup>(
        &self,
        generator: &BasisGenerator<G>,
        reduced: ArrayView1<f64>,
    ) -> anyhow::Result<Array1<f64>> {
        let interval = generator
            .interval_count()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("no snapshot has been absorbed yet"))?;
        expand(generator, interval, reduced)
    }
}

fn expand<G: ProcessGroup>(
    generator: &BasisGenerator<G>,
    interval: usize,
    reduced: ArrayView1<f64>,
) -> anyhow::Result<Array1<f64>> {
    let sigma = generator.singular_values_at(interval)?;
    if reduced.len() != sigma.len() {
        bail!(
            "reduced coordinates have {} entries, the factorization has rank {}",
            reduced.len(),
            sigma.len()
        );
    }
    let coefficients = reduced.to_owned() * sigma;
    Ok(generator.basis_at(interval)?.dot(&coefficients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn generator_with(
        dim: usize,
        max_per_interval: usize,
        snapshots: &[Vec<f64>],
    ) -> BasisGenerator {
        let mut generator = BasisGenerator::builder(dim)
            .update_right_sv(true)
            .retain_snapshots(true)
            .max_increments_per_interval(max_per_interval)
            .build()
            .unwrap();
        for (step, snapshot) in snapshots.iter().enumerate() {
            generator.take_sample(snapshot, step as f64).unwrap();
        }
        generator
    }

    #[test]
    fn evaluation_reproduces_an_absorbed_snapshot() {
        let mut rng = StdRng::seed_from_u64(17);
        let snapshots: Vec<Vec<f64>> = (0..4)
            .map(|_| (0..6).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        let generator = generator_with(6, usize::MAX, &snapshots);

        let evaluator = ReducedModelEvaluator::new();
        for (step, snapshot) in snapshots.iter().enumerate() {
            let state = evaluator.evaluate(&generator, step as f64).unwrap();
            for (i, &x) in snapshot.iter().enumerate() {
                assert_abs_diff_eq!(state[i], x, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn evaluation_picks_the_nearest_sample() {
        let snapshots = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let generator = generator_with(2, usize::MAX, &snapshots);
        let evaluator = ReducedModelEvaluator::new();

        // t=0.2 is closest to the first sample, t=0.9 to the second
        let early = evaluator.evaluate(&generator, 0.2).unwrap();
        assert_abs_diff_eq!(early[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(early[1], 0.0, epsilon = 1e-12);
        let late = evaluator.evaluate(&generator, 0.9).unwrap();
        assert_abs_diff_eq!(late[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(late[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn evaluation_selects_the_covering_interval() {
        let snapshots = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 5.0],
        ];
        let generator = generator_with(3, 2, &snapshots);
        assert_eq!(generator.interval_count(), 2);

        let evaluator = ReducedModelEvaluator::new();
        let state = evaluator.evaluate(&generator, 10.0).unwrap();
        assert_abs_diff_eq!(state[2], 5.0, epsilon = 1e-12);

        let state = evaluator.evaluate(&generator, 0.0).unwrap();
        assert_abs_diff_eq!(state[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cache_is_invalidated_by_mutation() {
        let snapshots = vec![vec![1.0, 0.0]];
        let mut generator = generator_with(2, usize::MAX, &snapshots);
        let evaluator = ReducedModelEvaluator::new();

        let before = evaluator.evaluate(&generator, 0.0).unwrap();
        assert_abs_diff_eq!(before[0], 1.0, epsilon = 1e-12);
        // cached result: same revision, same time
        let again = evaluator.evaluate(&generator, 0.0).unwrap();
        assert_eq!(before, again);

        generator.take_sample(&[1.0, 1.0], 1.0).unwrap();
        let after = evaluator.evaluate(&generator, 0.0).unwrap();
        for (i, &x) in [1.0, 0.0].iter().enumerate() {
            assert_abs_diff_eq!(after[i], x, epsilon = 1e-10);
        }
    }

    #[test]
    fn external_coordinates_expand_against_the_basis() {
        let snapshots = vec![vec![3.0, 0.0, 0.0], vec![0.0, 2.0, 0.0]];
        let generator = generator_with(3, usize::MAX, &snapshots);
        let evaluator = ReducedModelEvaluator::new();

        // unit coordinate along the dominant mode scales by sigma_0
        let sigma = generator.singular_values().unwrap().clone();
        let state = evaluator
            .reconstruct(&generator, array![1.0, 0.0].view())
            .unwrap();
        let norm = state.mapv(|x| x * x).sum().sqrt();
        assert_abs_diff_eq!(norm, sigma[0], epsilon = 1e-12);

        // dimension mismatch is a programmer error
        assert!(evaluator
            .reconstruct(&generator, array![1.0, 0.0, 0.0].view())
            .is_err());
    }

    #[test]
    fn times_outside_every_interval_fail() {
        let generator = generator_with(2, usize::MAX, &[vec![1.0, 1.0]]);
        let evaluator = ReducedModelEvaluator::new();
        assert!(evaluator.evaluate(&generator, -1.0).is_err());

        let empty = BasisGenerator::builder(2).build().unwrap();
        assert!(evaluator.evaluate(&empty, 0.0).is_err());
        assert!(evaluator
            .reconstruct(&empty, array![1.0].view())
            .is_err());
    }
}
