//! Trains latent-factor models over the accommodation ratings and selects
//! the best configuration by held-out error.

use crate::database::models::Rating;
use crate::database::mongodb;
use crate::dataset::{self, RatingSet};
use crate::opts::SearchOpts;
use crate::prelude::*;

use self::search::SearchGrid;

pub mod als;
pub mod metrics;
pub mod model;
pub mod search;

/// Runs the `search` subcommand: loads the ratings, searches the grid and
/// reports the selected configuration. Nothing durable is written.
pub async fn run(opts: SearchOpts) -> Result {
    let database = mongodb::open(&opts.connections.database_uri).await?;
    let ratings = RatingSet::new(Rating::fetch_all(&database).await?)?;
    info!(n_ratings = ratings.len(), "ratings loaded");

    let mut split = dataset::split(&ratings, opts.split.proportions, opts.split.seed);
    if opts.include_user_history {
        split.include_user_history(&ratings, &opts.user_ids);
    }
    info!(
        n_training = split.training.len(),
        n_validation = split.validation.len(),
        n_test = split.test.len(),
        "split",
    );

    let grid = SearchGrid {
        ranks: opts.ranks,
        iterations: opts.iterations,
        regularizations: opts.regularizations,
    };
    let outcome = search::search(&split.training, &split.validation, &grid, opts.split.seed)?;
    info!(
        rank = outcome.params.rank,
        iterations = outcome.params.iterations,
        regularization = outcome.params.regularization,
        rmse = outcome.rmse,
        "best configuration",
    );

    let test_rmse = metrics::rmse(&outcome.model, &split.test)?;
    info!(test_rmse, "error of the selected model on the test subset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Rating;
    use crate::dataset::ThreeWaySplit;
    use crate::trainer::als::{self, FitParams};

    fn rating(user_id: i32, acco_id: i32, rating: f64) -> Rating {
        Rating {
            user_id,
            acco_id,
            rating,
        }
    }

    /// 3 users, 4 accommodations, 8 ratings, consistent with the user
    /// affinities (2, 2.5, 1.5) against the accommodation appeals
    /// (1.6, 2, 1.8, 1.2): every rating is the product of the two.
    fn eight_ratings() -> Vec<Rating> {
        vec![
            rating(1, 1, 3.2),
            rating(1, 3, 3.6),
            rating(1, 4, 2.4),
            rating(2, 1, 4.0),
            rating(2, 2, 5.0),
            rating(2, 3, 4.5),
            rating(3, 2, 3.0),
            rating(3, 3, 2.7),
        ]
    }

    #[test]
    fn the_pipeline_learns_the_small_matrix() {
        let source = RatingSet::new(eight_ratings()).unwrap();
        // Hold out (2, 3): the rating graph of the remaining rows stays
        // connected and still covers both sides of the held-out pair.
        let (held_out, training): (Vec<Rating>, Vec<Rating>) = source
            .ratings()
            .iter()
            .copied()
            .partition(|rating| rating.user_id == 2 && rating.acco_id == 3);
        let training = RatingSet::new(training).unwrap();
        let held_out = RatingSet::new(held_out).unwrap();

        let params = FitParams {
            rank: 2,
            iterations: 10,
            regularization: 0.1,
        };
        let model = als::fit(&training, &params, 42).unwrap();
        let rmse = metrics::rmse(&model, &held_out).unwrap();
        assert!(rmse <= 1.0, "held-out RMSE is {}", rmse);
    }

    #[test]
    fn user_history_changes_the_training_subset_only_when_asked() {
        let source = RatingSet::new(eight_ratings()).unwrap();
        let make_split = || ThreeWaySplit {
            training: RatingSet::new(
                source
                    .ratings()
                    .iter()
                    .filter(|rating| rating.user_id != 3)
                    .copied()
                    .collect(),
            )
            .unwrap(),
            validation: RatingSet::new(vec![rating(3, 2, 3.0)]).unwrap(),
            test: RatingSet::new(vec![rating(3, 3, 2.7)]).unwrap(),
        };

        // Off: the target user's history stays out of training.
        let without = make_split();
        assert!(!without.training.rated_pairs().contains(&(3, 2)));

        // On: the full history of user 3 is folded in.
        let mut with = make_split();
        with.include_user_history(&source, &[3]);
        assert!(with.training.rated_pairs().contains(&(3, 2)));
        assert!(with.training.rated_pairs().contains(&(3, 3)));
        assert_eq!(with.training.len(), without.training.len() + 2);

        // With the history included the model can score user 3.
        let params = FitParams {
            rank: 2,
            iterations: 10,
            regularization: 0.1,
        };
        let model = als::fit(&with.training, &params, 42).unwrap();
        assert!(model.knows_user(3));

        let blind_model = als::fit(&without.training, &params, 42).unwrap();
        assert!(!blind_model.knows_user(3));
    }
}
