//! Rating sets and the three-way split.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::database::models::{AccoId, Rating, UserId};
use crate::error::PipelineError;
use crate::prelude::*;

/// Relative weights of the training, validation and test subsets.
#[derive(Debug, Clone, Copy)]
pub struct Proportions {
    training: f64,
    validation: f64,
    test: f64,
}

impl Proportions {
    pub fn new(training: f64, validation: f64, test: f64) -> StdResult<Self, PipelineError> {
        let weights = [training, validation, test];
        if weights.iter().any(|weight| !weight.is_finite() || *weight <= 0.0) {
            return Err(PipelineError::InvalidProportions { weights });
        }
        Ok(Self {
            training,
            validation,
            test,
        })
    }
}

impl Default for Proportions {
    /// The conventional 60/20/20 split.
    fn default() -> Self {
        Self {
            training: 6.0,
            validation: 2.0,
            test: 2.0,
        }
    }
}

impl FromStr for Proportions {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.split(':').collect::<Vec<&str>>().as_slice() {
            [training, validation, test] => Ok(Self::new(
                f64::from_str(training)?,
                f64::from_str(validation)?,
                f64::from_str(test)?,
            )?),
            _ => Err(anyhow!("expected three `:`-separated weights, e.g. `6:2:2`")),
        }
    }
}

/// Order-irrelevant collection of ratings,
/// at most one rating per (user, accommodation) pair.
#[derive(Debug, Clone)]
pub struct RatingSet {
    ratings: Vec<Rating>,
}

impl RatingSet {
    /// A duplicate (user, accommodation) pair is a data-quality error,
    /// it is never silently merged.
    pub fn new(ratings: Vec<Rating>) -> StdResult<Self, PipelineError> {
        let mut seen: AHashSet<(UserId, AccoId)> = AHashSet::default();
        for rating in &ratings {
            if !seen.insert((rating.user_id, rating.acco_id)) {
                return Err(PipelineError::DuplicateRating {
                    user_id: rating.user_id,
                    acco_id: rating.acco_id,
                });
            }
        }
        Ok(Self { ratings })
    }

    #[must_use]
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    #[must_use]
    pub fn rated_pairs(&self) -> AHashSet<(UserId, AccoId)> {
        self.ratings
            .iter()
            .map(|rating| (rating.user_id, rating.acco_id))
            .collect()
    }

    #[must_use]
    pub fn group_by_user(&self) -> AHashMap<UserId, Vec<(AccoId, f64)>> {
        let mut groups: AHashMap<UserId, Vec<(AccoId, f64)>> = AHashMap::default();
        for rating in &self.ratings {
            groups
                .entry(rating.user_id)
                .or_default()
                .push((rating.acco_id, rating.rating));
        }
        groups
    }

    #[must_use]
    pub fn group_by_acco(&self) -> AHashMap<AccoId, Vec<(UserId, f64)>> {
        let mut groups: AHashMap<AccoId, Vec<(UserId, f64)>> = AHashMap::default();
        for rating in &self.ratings {
            groups
                .entry(rating.acco_id)
                .or_default()
                .push((rating.user_id, rating.rating));
        }
        groups
    }
}

pub struct ThreeWaySplit {
    pub training: RatingSet,
    pub validation: RatingSet,
    pub test: RatingSet,
}

impl ThreeWaySplit {
    /// Appends the full rating history of the given users to the training
    /// subset, skipping the rows that are already there.
    ///
    /// The subsets intentionally stop being a partition of the source after
    /// this: it is the explicit opt-in behind `--include-user-history`.
    pub fn include_user_history(&mut self, source: &RatingSet, user_ids: &[UserId]) {
        let targets: AHashSet<UserId> = user_ids.iter().copied().collect();
        let existing = self.training.rated_pairs();
        let n_before = self.training.len();
        for rating in source.ratings() {
            if targets.contains(&rating.user_id)
                && !existing.contains(&(rating.user_id, rating.acco_id))
            {
                self.training.ratings.push(*rating);
            }
        }
        debug!(
            n_users = targets.len(),
            n_added = self.training.len() - n_before,
            "user history folded into the training subset",
        );
    }
}

/// Partitions the ratings into three disjoint subsets whose union is the
/// input and whose sizes are proportional to the weights within rounding.
/// The same seed and input always produce the same partition.
#[instrument(skip_all, fields(n_ratings = source.len(), seed))]
pub fn split(source: &RatingSet, proportions: Proportions, seed: u64) -> ThreeWaySplit {
    let mut shuffled = source.ratings.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

    let total = proportions.training + proportions.validation + proportions.test;
    let n_ratings = shuffled.len() as f64;
    let first_cut = (n_ratings * proportions.training / total).round() as usize;
    let second_cut =
        (n_ratings * (proportions.training + proportions.validation) / total).round() as usize;

    let test = shuffled.split_off(second_cut);
    let validation = shuffled.split_off(first_cut);
    ThreeWaySplit {
        training: RatingSet { ratings: shuffled },
        validation: RatingSet { ratings: validation },
        test: RatingSet { ratings: test },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: UserId, acco_id: AccoId, rating: f64) -> Rating {
        Rating {
            user_id,
            acco_id,
            rating,
        }
    }

    fn ten_ratings() -> RatingSet {
        let ratings = (0..10)
            .map(|index| rating(index / 4, index % 4, f64::from(index)))
            .collect();
        RatingSet::new(ratings).unwrap()
    }

    #[test]
    fn non_positive_proportions_fail() {
        assert!(matches!(
            Proportions::new(6.0, 0.0, 2.0),
            Err(PipelineError::InvalidProportions { .. }),
        ));
        assert!(matches!(
            Proportions::new(-1.0, 2.0, 2.0),
            Err(PipelineError::InvalidProportions { .. }),
        ));
        assert!(matches!(
            Proportions::new(f64::NAN, 2.0, 2.0),
            Err(PipelineError::InvalidProportions { .. }),
        ));
    }

    #[test]
    fn proportions_from_str_ok() {
        assert!(Proportions::from_str("6:2:2").is_ok());
        assert!(Proportions::from_str("6:2").is_err());
        assert!(Proportions::from_str("a:b:c").is_err());
    }

    #[test]
    fn duplicate_rating_fails() {
        let result = RatingSet::new(vec![rating(1, 2, 3.0), rating(1, 2, 4.0)]);
        assert_eq!(
            result.err(),
            Some(PipelineError::DuplicateRating {
                user_id: 1,
                acco_id: 2,
            }),
        );
    }

    #[test]
    fn split_sizes_match_the_weights() {
        let split = split(&ten_ratings(), Proportions::default(), 42);
        assert_eq!(split.training.len(), 6);
        assert_eq!(split.validation.len(), 2);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn split_is_a_partition() {
        let source = ten_ratings();
        let split = split(&source, Proportions::default(), 42);

        let mut union: Vec<Rating> = split
            .training
            .ratings()
            .iter()
            .chain(split.validation.ratings())
            .chain(split.test.ratings())
            .copied()
            .collect();
        union.sort_by(|lhs, rhs| {
            (lhs.user_id, lhs.acco_id).cmp(&(rhs.user_id, rhs.acco_id))
        });
        let mut expected = source.ratings().to_vec();
        expected.sort_by(|lhs, rhs| {
            (lhs.user_id, lhs.acco_id).cmp(&(rhs.user_id, rhs.acco_id))
        });
        assert_eq!(union, expected);

        let training_pairs = split.training.rated_pairs();
        assert!(split
            .validation
            .ratings()
            .iter()
            .chain(split.test.ratings())
            .all(|rating| !training_pairs.contains(&(rating.user_id, rating.acco_id))));
    }

    #[test]
    fn split_is_reproducible() {
        let source = ten_ratings();
        let first = split(&source, Proportions::default(), 42);
        let second = split(&source, Proportions::default(), 42);
        assert_eq!(first.training.ratings(), second.training.ratings());
        assert_eq!(first.validation.ratings(), second.validation.ratings());
        assert_eq!(first.test.ratings(), second.test.ratings());
    }

    #[test]
    fn include_user_history_appends_missing_rows_only() {
        let source = RatingSet::new(vec![
            rating(1, 1, 3.0),
            rating(1, 2, 4.0),
            rating(2, 1, 5.0),
        ])
        .unwrap();
        let mut split = ThreeWaySplit {
            training: RatingSet::new(vec![rating(1, 1, 3.0), rating(2, 1, 5.0)]).unwrap(),
            validation: RatingSet::new(vec![rating(1, 2, 4.0)]).unwrap(),
            test: RatingSet::new(Vec::new()).unwrap(),
        };

        split.include_user_history(&source, &[1]);
        assert_eq!(split.training.len(), 3);
        assert!(split.training.rated_pairs().contains(&(1, 2)));

        // A second pass adds nothing.
        split.include_user_history(&source, &[1]);
        assert_eq!(split.training.len(), 3);
    }

    #[test]
    fn include_user_history_is_a_no_op_without_targets() {
        let source = ten_ratings();
        let mut split = split(&source, Proportions::default(), 42);
        let n_before = split.training.len();
        split.include_user_history(&source, &[]);
        assert_eq!(split.training.len(), n_before);
    }
}
