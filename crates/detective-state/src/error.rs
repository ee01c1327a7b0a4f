//! Error types for the metrics store.

use detective_core::{ParseError, ValidationError};
use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

/// Why a page-metric submission was not stored.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The client stored a metric less than one lock TTL ago.
    #[error("page metric storage is locked for this client")]
    LockConflict,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage read or write failed. Nothing is assumed committed.
    #[error("failed to store page metrics: {0}")]
    Persist(#[source] StateError),
}

/// Why stored metrics could not be read back.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
