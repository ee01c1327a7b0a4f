pub mod config;
pub mod error;
pub mod grouping;
pub mod hash;
pub mod parse;
pub mod prefixer;
pub mod submission;
pub mod types;

pub use config::DetectiveConfig;
pub use error::{ConfigError, ParseError, ValidationError};
pub use grouping::{classify, group_by_breakpoint, group_and_sample, GroupingMode, UrlMetricsGroup, UrlMetricsGroups};
pub use hash::{client_lock_key, url_slug};
pub use parse::{parse_stored_metrics, serialize_metrics};
pub use prefixer::UrlPatternPrefixer;
pub use submission::UrlMetricSubmission;
pub use types::*;
