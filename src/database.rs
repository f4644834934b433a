//! Store boundary.

use thiserror::Error;

pub mod mongodb;

pub use self::mongodb::models;

/// Store failures are the only retryable errors in the pipeline: they are
/// retried a bounded number of times at this boundary, and exhausting the
/// retries aborts the run without partial writes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to the store")]
    Connection(#[source] ::mongodb::error::Error),

    #[error("the store URI does not name a database")]
    MissingDatabase,

    #[error("failed to overwrite the recommendations")]
    Write(#[source] ::mongodb::error::Error),
}
