//! Batch top-N scoring of unrated accommodations.

use crate::database::models::{AccoId, Accommodation, Rating, Recommendation, UserId};
use crate::database::mongodb;
use crate::dataset::{self, RatingSet};
use crate::error::PipelineError;
use crate::opts::RecommendOpts;
use crate::prelude::*;
use crate::trainer::als::{self, FitParams};
use crate::trainer::model::Model;

pub const DEFAULT_TOP_N: usize = 5;

/// Runs the `recommend` subcommand: trains a single configuration, scores
/// the target users and overwrites the stored recommendations.
pub async fn run(opts: RecommendOpts) -> Result {
    let database = mongodb::open(&opts.connections.database_uri).await?;
    let accommodations = Accommodation::fetch_all(&database).await?;
    let ratings = RatingSet::new(Rating::fetch_all(&database).await?)?;
    info!(
        n_accommodations = accommodations.len(),
        n_ratings = ratings.len(),
        "loaded",
    );

    let mut split = dataset::split(&ratings, opts.split.proportions, opts.split.seed);
    if opts.include_user_history {
        split.include_user_history(&ratings, &opts.user_ids);
    }

    let params = FitParams {
        rank: opts.rank,
        iterations: opts.iterations,
        regularization: opts.regularization,
    };
    let model = als::fit(&split.training, &params, opts.split.seed)?;
    info!(
        rank = model.rank(),
        n_users = model.n_users(),
        n_accommodations = model.n_accommodations(),
        "model fitted",
    );

    let rated = ratings.rated_pairs();
    let user_ids = if opts.user_ids.is_empty() {
        model.user_ids()
    } else {
        opts.user_ids
    };

    let mut rows = Vec::new();
    for user_id in user_ids {
        rows.extend(top_n(
            &model,
            &accommodations,
            &rated,
            user_id,
            opts.top_n,
        )?);
    }
    info!(n_rows = rows.len(), "scored");

    Recommendation::overwrite_all(&database, &rows).await?;
    info!("recommendations written");
    Ok(())
}

/// The top N accommodations the user has not rated yet, best first.
///
/// The ordering is deterministic: strictly descending score, ties broken by
/// ascending accommodation id. An accommodation that never occurred in
/// training has no factor vector and cannot be scored, so it is not a
/// candidate.
pub fn top_n(
    model: &Model,
    accommodations: &[Accommodation],
    rated: &AHashSet<(UserId, AccoId)>,
    user_id: UserId,
    n: usize,
) -> StdResult<Vec<Recommendation>, PipelineError> {
    if !model.knows_user(user_id) {
        return Err(PipelineError::UnknownUser(user_id));
    }

    let mut n_cold = 0;
    let mut candidates: Vec<(AccoId, f64)> = Vec::new();
    for accommodation in accommodations {
        if rated.contains(&(user_id, accommodation.id)) {
            continue;
        }
        if !model.knows_accommodation(accommodation.id) {
            n_cold += 1;
            continue;
        }
        candidates.push((accommodation.id, model.predict(user_id, accommodation.id)?));
    }
    if n_cold > 0 {
        debug!(user_id, n_cold, "cold accommodations were not scored");
    }

    candidates.sort_unstable_by(|(left_id, left), (right_id, right)| {
        right.total_cmp(left).then_with(|| left_id.cmp(right_id))
    });
    candidates.truncate(n);

    Ok(candidates
        .into_iter()
        .map(|(acco_id, prediction)| Recommendation::new(user_id, acco_id, prediction))
        .collect())
}
