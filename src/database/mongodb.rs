//! MongoDB-backed rating store.

use std::future::Future;

use mongodb::bson::doc;
use mongodb::Database;

use crate::database::StoreError;
use crate::helpers::backoff::Backoff;
use crate::prelude::*;

pub mod models;
pub mod traits;

use self::traits::Indexes;

/// Store operations are attempted this many times before the run is aborted.
const MAX_ATTEMPTS: i32 = 4;

/// Opens the connection and verifies it with a ping.
///
/// Connectivity failures are retried with backoff, a malformed URI is not.
#[instrument(skip_all)]
pub async fn open(uri: &str) -> StdResult<Database, StoreError> {
    let client = mongodb::Client::with_uri_str(uri)
        .await
        .map_err(StoreError::Connection)?;
    let database = client
        .default_database()
        .ok_or(StoreError::MissingDatabase)?;

    ping(&database).await.map_err(StoreError::Connection)?;

    models::Rating::ensure_indexes(&database)
        .await
        .map_err(StoreError::Connection)?;
    models::Recommendation::ensure_indexes(&database)
        .await
        .map_err(StoreError::Connection)?;

    info!("connected");
    Ok(database)
}

async fn ping(database: &Database) -> StdResult<(), mongodb::error::Error> {
    with_retries("ping", || async move {
        database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    })
    .await
}

/// Retries the operation with exponential backoff and jitter.
pub(crate) async fn with_retries<T, F, Fut>(
    operation: &str,
    mut attempt: F,
) -> StdResult<T, mongodb::error::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StdResult<T, mongodb::error::Error>>,
{
    let mut backoff = Backoff::new(100, 2000);
    loop {
        match attempt().await {
            Ok(value) => break Ok(value),
            Err(error) if backoff.n_attempts() < MAX_ATTEMPTS => {
                let delay = backoff.next();
                warn!(
                    operation,
                    n_attempt = backoff.n_attempts(),
                    ?delay,
                    %error,
                    "store operation failed, retrying…",
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => break Err(error),
        }
    }
}
