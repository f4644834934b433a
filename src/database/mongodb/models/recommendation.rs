use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{bson, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::database::mongodb::models::{AccoId, UserId};
use crate::database::mongodb::traits::{Indexes, TypedDocument};
use crate::database::mongodb::with_retries;
use crate::database::StoreError;
use crate::prelude::*;

/// A precomputed top-N row, the only durable output of a pipeline run.
#[serde_with::serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Recommendation {
    #[serde(rename = "userId")]
    pub user_id: UserId,

    #[serde(rename = "accoId")]
    pub acco_id: AccoId,

    pub prediction: f64,

    #[serde(rename = "createdAt")]
    #[serde_as(as = "bson::DateTime")]
    pub created_at: DateTime,
}

impl TypedDocument for Recommendation {
    const NAME: &'static str = "recommendations";
}

impl Indexes for Recommendation {
    type I = [IndexModel; 1];

    /// The serving boundary reads per user, best first.
    fn indexes() -> Self::I {
        [IndexModel::builder()
            .keys(doc! { "userId": 1, "prediction": -1 })
            .build()]
    }
}

impl Recommendation {
    #[must_use]
    pub fn new(user_id: UserId, acco_id: AccoId, prediction: f64) -> Self {
        Self {
            user_id,
            acco_id,
            prediction,
            created_at: Utc::now(),
        }
    }

    /// Replaces the whole recommendation collection with the given rows.
    ///
    /// The run treats this as an atomic overwrite: each retry restarts from
    /// the delete, so a partially failed attempt never accumulates rows.
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub async fn overwrite_all(to: &Database, rows: &[Self]) -> StdResult<(), StoreError> {
        let start_instant = Instant::now();
        with_retries("overwrite_recommendations", || async move {
            let collection = Self::collection(to);
            collection.delete_many(doc! {}, None).await?;
            if !rows.is_empty() {
                collection.insert_many(rows, None).await?;
            }
            Ok(())
        })
        .await
        .map_err(StoreError::Write)?;
        info!(elapsed = ?start_instant.elapsed(), "overwritten");
        Ok(())
    }

    /// Stored recommendations for a user, best first.
    #[instrument(skip_all, fields(user_id))]
    pub async fn fetch_by_user(
        from: &Database,
        user_id: UserId,
    ) -> StdResult<Vec<Self>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "prediction": -1 })
            .build();
        let recommendations: Vec<Self> = with_retries("fetch_recommendations", || {
            let options = options.clone();
            async move {
                Self::collection(from)
                    .find(doc! { "userId": user_id }, options)
                    .await?
                    .try_collect()
                    .await
            }
        })
        .await
        .map_err(StoreError::Connection)?;
        debug!(n_recommendations = recommendations.len());
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a live MongoDB at `MONGODB_URI`"]
    async fn overwrite_replaces_the_previous_rows() -> crate::prelude::Result {
        let uri = std::env::var("MONGODB_URI")?;
        let database = crate::database::mongodb::open(&uri).await?;

        let rows = vec![
            Recommendation::new(1, 10, 4.5),
            Recommendation::new(1, 11, 4.0),
        ];
        Recommendation::overwrite_all(&database, &rows).await?;
        Recommendation::overwrite_all(&database, &rows).await?;

        let fetched = Recommendation::fetch_by_user(&database, 1).await?;
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].acco_id, 10);
        assert_eq!(fetched[1].acco_id, 11);
        Ok(())
    }
}
