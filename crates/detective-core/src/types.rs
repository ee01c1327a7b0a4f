//! Shared types used across Optimization Detective crates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Viewport dimensions reported by the visitor's browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Measurement of a single element on the page.
///
/// Only the members read by the optimizer are typed. Anything else the
/// client reported is kept verbatim in `extra` so it survives a round-trip
/// through storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMetric {
    /// XPath of the element within the document.
    pub xpath: String,
    /// Whether this element was the Largest Contentful Paint element.
    #[serde(default)]
    pub is_lcp: bool,
    /// Whether this element was ever an LCP candidate.
    #[serde(default)]
    pub is_lcp_candidate: bool,
    /// Fraction of the element visible in the initial viewport.
    #[serde(default)]
    pub intersection_ratio: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One client-submitted sample, as persisted against a URL.
///
/// A `PageMetric` has no identity of its own; it only exists as a member
/// of the newest-first sequence stored for a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetric {
    pub viewport: Viewport,
    pub elements: Vec<ElementMetric>,
    /// Unix timestamp (seconds) assigned by the server on insertion.
    pub timestamp: u64,
}

impl PageMetric {
    /// XPath of the element flagged as LCP in this sample, if any.
    pub fn lcp_xpath(&self) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.is_lcp)
            .map(|e| e.xpath.as_str())
    }
}
