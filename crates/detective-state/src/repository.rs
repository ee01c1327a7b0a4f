//! Storage seams used by the metrics store and the storage lock.
//!
//! [`StateStore`](crate::StateStore) implements both traits. Other
//! implementations only need create/read/update by key.

use crate::error::StateResult;
use crate::types::{LockEntry, UrlMetricsDocument};

/// Documents keyed by URL slug, each holding `(slug, title, content)`.
pub trait UrlMetricsRepository: Send + Sync {
    fn find(&self, slug: &str) -> StateResult<Option<UrlMetricsDocument>>;

    /// Create or replace the document with `doc.slug`.
    fn save(&self, doc: &UrlMetricsDocument) -> StateResult<()>;
}

/// Per-client lock entries keyed by client lock key.
pub trait LockRepository: Send + Sync {
    fn load_lock(&self, key: &str) -> StateResult<Option<LockEntry>>;

    fn store_lock(&self, key: &str, entry: &LockEntry) -> StateResult<()>;

    fn clear_lock(&self, key: &str) -> StateResult<bool>;
}
