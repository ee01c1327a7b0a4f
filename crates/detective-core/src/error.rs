//! Error types shared by the Optimization Detective crates.

use thiserror::Error;

/// Failure to turn persisted content back into page metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The content is not valid JSON.
    #[error("stored page metrics are not valid JSON: {0}")]
    Malformed(String),

    /// The content is JSON, but not an array.
    #[error("stored page metrics were not a JSON array (found {0})")]
    NotAnArray(&'static str),
}

/// A submission rejected at the REST boundary. Nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid page metric: {}", .0.join("; "))]
pub struct ValidationError(pub Vec<String>);

/// Configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The URL pattern prefixer has no base path for this context.
    #[error("invalid context {0:?}")]
    UnknownContext(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
