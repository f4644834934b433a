//! Alternating least squares.
//!
//! Each round alternates two half-steps: the user factors are re-solved
//! against a fixed snapshot of the accommodation factors, then the other way
//! around. A half-step is a set of independent ridge regressions, one per
//! entity, so the workers share nothing but the read-only snapshot and the
//! collect acts as the barrier between the phases. The factor maps are fully
//! replaced between phases, never mutated in place.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::RatingSet;
use crate::error::{Entity, PipelineError};
use crate::math;
use crate::prelude::*;
use crate::trainer::model::Model;

#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    pub rank: usize,
    pub iterations: usize,
    pub regularization: f64,
}

/// Fits a latent-factor model on the training set.
///
/// The fixed iteration count is the only stopping rule: the outer model
/// selection already measures convergence through the validation error.
#[instrument(
    skip_all,
    fields(
        n_ratings = training.len(),
        rank = params.rank,
        iterations = params.iterations,
        regularization = params.regularization,
    ),
)]
pub fn fit(training: &RatingSet, params: &FitParams, seed: u64) -> StdResult<Model, PipelineError> {
    if params.rank == 0 {
        return Err(PipelineError::InvalidRank);
    }
    if training.is_empty() {
        return Err(PipelineError::EmptyTrainingSet);
    }
    debug_assert!(params.regularization >= 0.0);

    let by_user = training.group_by_user();
    let by_acco = training.group_by_acco();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut user_factors = initialize_factors(by_user.keys().copied(), params.rank, &mut rng);
    let mut acco_factors = initialize_factors(by_acco.keys().copied(), params.rank, &mut rng);

    let start_instant = Instant::now();
    for iteration in 1..=params.iterations {
        user_factors = solve_half_step(&by_user, &acco_factors, params, Entity::User)?;
        acco_factors = solve_half_step(&by_acco, &user_factors, params, Entity::Accommodation)?;
        trace!(iteration, "round completed");
    }
    debug!(
        n_users = user_factors.len(),
        n_accommodations = acco_factors.len(),
        elapsed = ?start_instant.elapsed(),
        "fitted",
    );

    Ok(Model::new(params.rank, user_factors, acco_factors))
}

/// Generates the initial factors as small random values from
/// `[-0.10, -0.05] ∪ [+0.05, +0.10]`.
///
/// The ids are sorted first so that the result depends on the seed alone,
/// not on the map iteration order.
fn initialize_factors(
    ids: impl Iterator<Item = i32>,
    rank: usize,
    rng: &mut StdRng,
) -> AHashMap<i32, Vec<f64>> {
    let mut ids: Vec<i32> = ids.collect();
    ids.sort_unstable();
    ids.into_iter()
        .map(|id| {
            let factors = (0..rank)
                .map(|_| {
                    let magnitude = 0.05 + 0.05 * rng.gen::<f64>();
                    if rng.gen() {
                        magnitude
                    } else {
                        -magnitude
                    }
                })
                .collect();
            (id, factors)
        })
        .collect()
}

/// Re-solves every entity's factor vector against the fixed counterparty
/// snapshot: a ridge regression over the entity's own ratings, solved through
/// the normal equations.
fn solve_half_step(
    groups: &AHashMap<i32, Vec<(i32, f64)>>,
    fixed: &AHashMap<i32, Vec<f64>>,
    params: &FitParams,
    entity: fn(i32) -> Entity,
) -> StdResult<AHashMap<i32, Vec<f64>>, PipelineError> {
    let rank = params.rank;
    groups
        .par_iter()
        .map(|(&id, ratings)| {
            let mut gram = vec![0.0; rank * rank];
            let mut rhs = vec![0.0; rank];
            for (counterparty_id, rating) in ratings {
                // Every counterparty occurs in the training set,
                // so the snapshot always holds its factors.
                let factors = &fixed[counterparty_id];
                for row in 0..rank {
                    for column in 0..rank {
                        gram[row * rank + column] += factors[row] * factors[column];
                    }
                    rhs[row] += rating * factors[row];
                }
            }
            for dimension in 0..rank {
                gram[dimension * rank + dimension] += params.regularization;
            }
            math::solve_symmetric(gram, rhs, rank)
                .ok_or(PipelineError::SingularSystem {
                    entity: entity(id),
                })
                .map(|factors| (id, factors))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Rating;
    use crate::trainer::metrics;

    /// A synthetic rank-2 rating matrix with an exactly known structure.
    fn synthetic() -> (RatingSet, RatingSet) {
        let user_factors = [
            [1.0, 0.5],
            [0.2, 1.3],
            [1.1, 1.0],
            [0.4, 0.6],
            [1.5, 0.1],
            [0.7, 1.2],
        ];
        let acco_factors = [
            [2.0, 1.0],
            [0.5, 2.5],
            [1.0, 1.0],
            [3.0, 0.2],
            [0.8, 1.8],
            [2.2, 0.4],
            [1.3, 2.0],
            [0.3, 0.9],
        ];

        let mut training = Vec::new();
        let mut held_out = Vec::new();
        for (user_index, user) in user_factors.iter().enumerate() {
            for (acco_index, acco) in acco_factors.iter().enumerate() {
                let rating = Rating {
                    user_id: user_index as i32,
                    acco_id: acco_index as i32,
                    rating: user[0] * acco[0] + user[1] * acco[1],
                };
                // Hold out one rating per user, over different accommodations.
                if acco_index == user_index {
                    held_out.push(rating);
                } else {
                    training.push(rating);
                }
            }
        }
        (
            RatingSet::new(training).unwrap(),
            RatingSet::new(held_out).unwrap(),
        )
    }

    #[test]
    fn zero_rank_fails() {
        let (training, _) = synthetic();
        let params = FitParams {
            rank: 0,
            iterations: 1,
            regularization: 0.1,
        };
        assert_eq!(
            fit(&training, &params, 42).err(),
            Some(PipelineError::InvalidRank),
        );
    }

    #[test]
    fn empty_training_set_fails() {
        let training = RatingSet::new(Vec::new()).unwrap();
        let params = FitParams {
            rank: 2,
            iterations: 1,
            regularization: 0.1,
        };
        assert_eq!(
            fit(&training, &params, 42).err(),
            Some(PipelineError::EmptyTrainingSet),
        );
    }

    #[test]
    fn recovers_a_low_rank_structure() {
        let (training, held_out) = synthetic();
        let params = FitParams {
            rank: 2,
            iterations: 30,
            regularization: 0.0,
        };
        let model = fit(&training, &params, 42).unwrap();
        let rmse = metrics::rmse(&model, &held_out).unwrap();
        assert!(rmse < 0.05, "held-out RMSE is {}", rmse);
    }

    #[test]
    fn more_iterations_fit_closer() {
        let (training, held_out) = synthetic();
        let short = FitParams {
            rank: 2,
            iterations: 2,
            regularization: 0.0,
        };
        let long = FitParams {
            rank: 2,
            iterations: 30,
            regularization: 0.0,
        };
        let short_rmse =
            metrics::rmse(&fit(&training, &short, 42).unwrap(), &held_out).unwrap();
        let long_rmse = metrics::rmse(&fit(&training, &long, 42).unwrap(), &held_out).unwrap();
        assert!(
            long_rmse < short_rmse,
            "expected {} < {}",
            long_rmse,
            short_rmse,
        );
    }

    #[test]
    fn fitting_is_reproducible() {
        let (training, _) = synthetic();
        let params = FitParams {
            rank: 2,
            iterations: 10,
            regularization: 0.1,
        };
        let first = fit(&training, &params, 42).unwrap();
        let second = fit(&training, &params, 42).unwrap();
        for user_id in 0..6 {
            for acco_id in 0..8 {
                assert_eq!(
                    first.predict(user_id, acco_id).unwrap(),
                    second.predict(user_id, acco_id).unwrap(),
                );
            }
        }
    }
}
