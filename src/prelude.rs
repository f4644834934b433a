pub use std::result::Result as StdResult;
pub use std::sync::Arc;
pub use std::time::{Duration as StdDuration, Instant};

pub use anyhow::{anyhow, bail, Context};
pub use async_trait::async_trait;
pub use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};

pub type AHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
pub type AHashSet<K> = std::collections::HashSet<K, ahash::RandomState>;

pub type DateTime = chrono::DateTime<chrono::Utc>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
