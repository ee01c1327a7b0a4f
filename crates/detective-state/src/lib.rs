//! detective-state — persistence for Optimization Detective page metrics.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for per-URL metrics documents and per-client storage locks.
//!
//! # Architecture
//!
//! ```text
//! SubmissionService::submit()
//!   ├── UrlMetricSubmission::validate()
//!   ├── StorageLock::is_locked()      ← per-client rate limit
//!   ├── MetricsStore::submit()        ← load, prepend, group, sample, persist
//!   └── StorageLock::acquire()
//! ```
//!
//! Documents are JSON-serialized into redb's `&[u8]` value columns. A
//! document's `content` is itself the serialized page-metric array, kept as
//! a string so that corrupt content can be detected and recovered from.

pub mod error;
pub mod lock;
pub mod metrics;
pub mod repository;
pub mod service;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{LoadError, StateError, StateResult, SubmitError};
pub use lock::StorageLock;
pub use metrics::{History, MetricsStore, SubmitOutcome, UrlMetrics};
pub use repository::{LockRepository, UrlMetricsRepository};
pub use service::SubmissionService;
pub use store::StateStore;
pub use types::*;
