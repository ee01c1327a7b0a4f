//! Decoding and encoding of the persisted page-metrics document.
//!
//! The document is a JSON array of [`PageMetric`] objects, newest first.

use serde_json::Value;
use tracing::warn;

use crate::error::ParseError;
use crate::types::PageMetric;

/// Parse stored content into page metrics.
///
/// Malformed JSON and non-array documents are errors. Entries that do not
/// decode as a [`PageMetric`] are dropped and the rest are kept.
pub fn parse_stored_metrics(content: &str) -> Result<Vec<PageMetric>, ParseError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let entries = match value {
        Value::Array(entries) => entries,
        other => return Err(ParseError::NotAnArray(json_kind(&other))),
    };

    let metrics = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(metric) => Some(metric),
            Err(e) => {
                warn!(index, error = %e, "dropping unreadable stored page metric");
                None
            }
        })
        .collect();
    Ok(metrics)
}

/// Serialize page metrics for storage.
pub fn serialize_metrics(metrics: &[PageMetric]) -> Result<String, serde_json::Error> {
    serde_json::to_string(metrics)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
