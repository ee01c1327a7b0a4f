//! Page-metric submissions as received at the REST boundary.
//!
//! Raw request bodies are deserialized into [`UrlMetricSubmission`] and then
//! checked with [`UrlMetricSubmission::validate`]. Only a validated
//! submission is turned into a [`PageMetric`]; nothing downstream ever sees
//! the raw body.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;
use crate::types::{ElementMetric, PageMetric, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlMetricSubmission {
    /// URL the metrics were captured on.
    pub url: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<ElementMetric>,
}

impl UrlMetricSubmission {
    /// Check the submission, collecting every problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.url.is_empty() {
            errors.push("url must not be empty".to_string());
        } else {
            match Url::parse(&self.url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => errors.push(format!("url scheme {:?} is not http(s)", parsed.scheme())),
                Err(e) => errors.push(format!("url is not valid: {e}")),
            }
        }

        if self.viewport.width == 0 {
            errors.push("viewport.width must be positive".to_string());
        }
        if self.viewport.height == 0 {
            errors.push("viewport.height must be positive".to_string());
        }

        for (i, element) in self.elements.iter().enumerate() {
            if element.xpath.is_empty() {
                errors.push(format!("elements[{i}].xpath must not be empty"));
            }
            if !(0.0..=1.0).contains(&element.intersection_ratio) {
                errors.push(format!("elements[{i}].intersection_ratio must be within 0..=1"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(errors))
        }
    }

    /// Split into the URL and the record to store, stamped with `now`.
    pub fn into_page_metric(self, now: u64) -> (String, PageMetric) {
        let metric = PageMetric {
            viewport: self.viewport,
            elements: self.elements,
            timestamp: now,
        };
        (self.url, metric)
    }
}
