use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::database::mongodb::models::{AccoId, UserId};
use crate::database::mongodb::traits::{Indexes, TypedDocument};
use crate::database::mongodb::with_retries;
use crate::database::StoreError;
use crate::prelude::*;

/// A single user's rating of a single accommodation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    #[serde(rename = "userId")]
    pub user_id: UserId,

    #[serde(rename = "accoId")]
    pub acco_id: AccoId,

    pub rating: f64,
}

impl TypedDocument for Rating {
    const NAME: &'static str = "ratings";
}

impl Indexes for Rating {
    type I = [IndexModel; 1];

    /// At most one rating per (user, accommodation) pair,
    /// enforced at the store level too.
    fn indexes() -> Self::I {
        [IndexModel::builder()
            .keys(doc! { "userId": 1, "accoId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()]
    }
}

impl Rating {
    #[instrument(skip_all)]
    pub async fn fetch_all(from: &Database) -> StdResult<Vec<Self>, StoreError> {
        let start_instant = Instant::now();
        let ratings: Vec<Self> = with_retries("fetch_ratings", || async move {
            Self::collection(from).find(None, None).await?.try_collect().await
        })
        .await
        .map_err(StoreError::Connection)?;
        debug!(n_ratings = ratings.len(), elapsed = ?start_instant.elapsed());
        Ok(ratings)
    }

    #[instrument(skip_all, fields(user_id))]
    pub async fn fetch_by_user(from: &Database, user_id: UserId) -> StdResult<Vec<Self>, StoreError> {
        let ratings: Vec<Self> = with_retries("fetch_user_ratings", || async move {
            Self::collection(from)
                .find(doc! { "userId": user_id }, None)
                .await?
                .try_collect()
                .await
        })
        .await
        .map_err(StoreError::Connection)?;
        debug!(n_ratings = ratings.len());
        Ok(ratings)
    }
}
