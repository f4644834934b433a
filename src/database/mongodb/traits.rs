use mongodb::{Collection, Database, IndexModel};

use crate::prelude::*;

pub trait TypedDocument: 'static + Sized + Send {
    const NAME: &'static str;

    #[inline]
    fn collection(in_: &Database) -> Collection<Self> {
        in_.collection(Self::NAME)
    }
}

#[async_trait]
pub trait Indexes: TypedDocument + Sync {
    type I: IntoIterator<Item = IndexModel> + Send;

    fn indexes() -> Self::I;

    #[instrument(skip_all, fields(collection = Self::NAME))]
    async fn ensure_indexes(on: &Database) -> StdResult<(), mongodb::error::Error> {
        Self::collection(on)
            .create_indexes(Self::indexes(), None)
            .await?;
        Ok(())
    }
}
