//! Hyperparameter grid search.

use itertools::iproduct;
use rayon::prelude::*;

use crate::dataset::RatingSet;
use crate::error::PipelineError;
use crate::prelude::*;
use crate::trainer::als::{self, FitParams};
use crate::trainer::metrics;
use crate::trainer::model::Model;

pub struct SearchGrid {
    pub ranks: Vec<usize>,
    pub iterations: Vec<usize>,
    pub regularizations: Vec<f64>,
}

impl SearchGrid {
    /// Grid points in a deterministic order: rank-major, then
    /// regularization, then iteration count.
    #[must_use]
    pub fn points(&self) -> Vec<FitParams> {
        iproduct!(&self.ranks, &self.regularizations, &self.iterations)
            .map(|(&rank, &regularization, &iterations)| FitParams {
                rank,
                iterations,
                regularization,
            })
            .collect()
    }
}

pub struct SearchOutcome {
    pub params: FitParams,
    pub model: Model,
    pub rmse: f64,
}

/// Trains a model per grid point and keeps the lowest validation error.
///
/// The grid points are trained in parallel, yet the selection is
/// deterministic: results are gathered in grid order and the first point
/// wins a tie.
#[instrument(skip_all, fields(n_training = training.len(), n_validation = validation.len()))]
pub fn search(
    training: &RatingSet,
    validation: &RatingSet,
    grid: &SearchGrid,
    seed: u64,
) -> StdResult<SearchOutcome, PipelineError> {
    let points = grid.points();
    if points.is_empty() {
        return Err(PipelineError::EmptyGrid);
    }

    let start_instant = Instant::now();
    let outcomes: Vec<(FitParams, Model, f64)> = points
        .into_par_iter()
        .map(|params| {
            let model = als::fit(training, &params, seed)?;
            let rmse = metrics::rmse(&model, validation)?;
            debug!(
                rank = params.rank,
                iterations = params.iterations,
                regularization = params.regularization,
                rmse,
                "grid point evaluated",
            );
            Ok((params, model, rmse))
        })
        .collect::<StdResult<_, PipelineError>>()?;

    let best_index = select_best(outcomes.iter().map(|(_, _, rmse)| *rmse))
        .ok_or(PipelineError::EmptyGrid)?;
    let mut outcomes = outcomes;
    let (params, model, rmse) = outcomes.swap_remove(best_index);
    info!(
        rank = params.rank,
        iterations = params.iterations,
        regularization = params.regularization,
        rmse,
        elapsed = ?start_instant.elapsed(),
        "selected",
    );
    Ok(SearchOutcome {
        params,
        model,
        rmse,
    })
}

/// Index of the smallest error, the earliest wins a tie.
fn select_best(rmses: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, rmse) in rmses.enumerate() {
        let better = match best {
            None => true,
            Some((_, best_rmse)) => rmse < best_rmse,
        };
        if better {
            best = Some((index, rmse));
        }
    }
    best.map(|(index, _)| index)
}
