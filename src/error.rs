//! Pipeline error taxonomy.
//!
//! Every variant carries the offending identifiers: these errors signal
//! upstream data or configuration bugs, so the run aborts immediately and
//! nothing is retried.

use thiserror::Error;

use crate::database::models::{AccoId, UserId};

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("invalid split proportions {weights:?}: weights must be positive and finite")]
    InvalidProportions { weights: [f64; 3] },

    #[error("duplicate rating for user #{user_id} and accommodation #{acco_id}")]
    DuplicateRating { user_id: UserId, acco_id: AccoId },

    #[error("the training set is empty")]
    EmptyTrainingSet,

    #[error("rank must be positive")]
    InvalidRank,

    #[error("the normal equations are singular for {entity}, try a non-zero regularization")]
    SingularSystem { entity: Entity },

    #[error("no factor vector for user #{0}")]
    UnknownUser(UserId),

    #[error("no factor vector for accommodation #{0}")]
    UnknownAccommodation(AccoId),

    #[error("the evaluation set is empty")]
    EmptyEvaluationSet,

    #[error("the hyperparameter grid is empty")]
    EmptyGrid,
}

/// Side of the factorization an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User(UserId),
    Accommodation(AccoId),
}

impl std::fmt::Display for Entity {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(user_id) => write!(formatter, "user #{}", user_id),
            Self::Accommodation(acco_id) => write!(formatter, "accommodation #{}", acco_id),
        }
    }
}
