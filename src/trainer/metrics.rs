//! Held-out error of a fitted model.

use crate::dataset::RatingSet;
use crate::error::PipelineError;
use crate::prelude::*;
use crate::trainer::model::Model;

/// Accumulates squared residuals.
#[derive(Default)]
pub struct Rmse {
    sum_of_squares: f64,
    count: usize,
}

impl Rmse {
    pub fn push(&mut self, residual: f64) {
        self.sum_of_squares += residual * residual;
        self.count += 1;
    }

    #[must_use]
    pub fn finalise(&self) -> f64 {
        (self.sum_of_squares / self.count.max(1) as f64).sqrt()
    }
}

/// Root-mean-square error of the model against a held-out set.
///
/// A user or accommodation without a factor vector signals a split/train
/// mismatch upstream and fails the whole evaluation, it is never skipped.
#[instrument(skip_all, fields(n_ratings = held_out.len()))]
pub fn rmse(model: &Model, held_out: &RatingSet) -> StdResult<f64, PipelineError> {
    if held_out.is_empty() {
        return Err(PipelineError::EmptyEvaluationSet);
    }
    let mut accumulator = Rmse::default();
    for rating in held_out.ratings() {
        let prediction = model.predict(rating.user_id, rating.acco_id)?;
        accumulator.push(prediction - rating.rating);
    }
    Ok(accumulator.finalise())
}
