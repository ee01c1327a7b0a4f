//! redb table definitions for the metrics store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// URL metrics documents keyed by `{url_slug}`.
pub const URL_METRICS: TableDefinition<&str, &[u8]> = TableDefinition::new("url_metrics");

/// Storage lock entries keyed by `{client_lock_key}`.
pub const STORAGE_LOCKS: TableDefinition<&str, &[u8]> = TableDefinition::new("storage_locks");
