use crate::database::models::{AccoId, UserId};
use crate::error::PipelineError;
use crate::math;
use crate::prelude::*;

/// A fitted latent-factor model. Immutable once returned by the trainer.
pub struct Model {
    rank: usize,
    user_factors: AHashMap<UserId, Vec<f64>>,
    acco_factors: AHashMap<AccoId, Vec<f64>>,
}

impl Model {
    pub(crate) fn new(
        rank: usize,
        user_factors: AHashMap<UserId, Vec<f64>>,
        acco_factors: AHashMap<AccoId, Vec<f64>>,
    ) -> Self {
        Self {
            rank,
            user_factors,
            acco_factors,
        }
    }

    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Predicted rating: the dot product of the two factor vectors.
    ///
    /// A user or accommodation that was absent from training has no factor
    /// vector, and the prediction fails loudly: cold starts are out of scope.
    pub fn predict(&self, user_id: UserId, acco_id: AccoId) -> StdResult<f64, PipelineError> {
        let user_factors = self
            .user_factors
            .get(&user_id)
            .ok_or(PipelineError::UnknownUser(user_id))?;
        let acco_factors = self
            .acco_factors
            .get(&acco_id)
            .ok_or(PipelineError::UnknownAccommodation(acco_id))?;
        Ok(math::dot(user_factors, acco_factors))
    }

    #[must_use]
    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.user_factors.contains_key(&user_id)
    }

    #[must_use]
    pub fn knows_accommodation(&self, acco_id: AccoId) -> bool {
        self.acco_factors.contains_key(&acco_id)
    }

    /// All users the model can score, in ascending order.
    #[must_use]
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut user_ids: Vec<UserId> = self.user_factors.keys().copied().collect();
        user_ids.sort_unstable();
        user_ids
    }

    #[must_use]
    pub fn n_users(&self) -> usize {
        self.user_factors.len()
    }

    #[must_use]
    pub fn n_accommodations(&self) -> usize {
        self.acco_factors.len()
    }
}
