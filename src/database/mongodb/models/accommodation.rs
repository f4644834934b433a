use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use crate::database::mongodb::models::AccoId;
use crate::database::mongodb::traits::TypedDocument;
use crate::database::mongodb::with_retries;
use crate::database::StoreError;
use crate::prelude::*;

/// Immutable reference data: the accommodations users rate.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Accommodation {
    #[serde(rename = "_id")]
    pub id: AccoId,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedDocument for Accommodation {
    const NAME: &'static str = "accommodations";
}

impl Accommodation {
    #[instrument(skip_all)]
    pub async fn fetch_all(from: &Database) -> StdResult<Vec<Self>, StoreError> {
        let start_instant = Instant::now();
        let accommodations: Vec<Self> = with_retries("fetch_accommodations", || async move {
            Self::collection(from).find(None, None).await?.try_collect().await
        })
        .await
        .map_err(StoreError::Connection)?;
        debug!(
            n_accommodations = accommodations.len(),
            elapsed = ?start_instant.elapsed(),
        );
        Ok(accommodations)
    }
}
