//! detective.toml configuration parser.
//!
//! Every section is optional. A missing file section or key falls back to
//! the defaults below, so an empty document is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grouping::GroupingMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectiveConfig {
    pub metrics: MetricsConfig,
    pub lock: LockConfig,
    pub url_patterns: UrlPatternsConfig,
    pub server: ServerConfig,
}

/// How page metrics are bucketed and sampled per URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Maximum viewport width (inclusive) of each breakpoint group.
    /// One boundary yields two groups: `<= b` and `> b`.
    pub breakpoints: Vec<u32>,
    /// Maximum number of samples kept per breakpoint group.
    pub sample_size: usize,
    pub grouping: GroupingMode,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![480],
            sample_size: 10,
            grouping: GroupingMode::default(),
        }
    }
}

impl MetricsConfig {
    /// Breakpoints sorted ascending with duplicates removed.
    pub fn normalized(&self) -> Self {
        let mut breakpoints = self.breakpoints.clone();
        breakpoints.sort_unstable();
        breakpoints.dedup();
        Self {
            breakpoints,
            ..self.clone()
        }
    }
}

/// Per-client storage lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Seconds a client is locked out after a stored submission. Zero disables locking.
    pub ttl_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

/// Base paths used when prefixing URL patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlPatternsConfig {
    /// Path of the frontend home URL.
    pub home: String,
    /// Path of the directory the site is installed in.
    pub site: String,
}

impl Default for UrlPatternsConfig {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            site: "/".to_string(),
        }
    }
}

impl UrlPatternsConfig {
    /// `context => base_path` pairs.
    pub fn contexts(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("home".to_string(), self.home.clone()),
            ("site".to_string(), self.site.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("/var/lib/detective"),
        }
    }
}

impl DetectiveConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DetectiveConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the grouping pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.breakpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "metrics.breakpoints must contain at least one width".to_string(),
            ));
        }
        if self.metrics.breakpoints.contains(&0) {
            return Err(ConfigError::Invalid(
                "metrics.breakpoints must be positive".to_string(),
            ));
        }
        if self.metrics.sample_size == 0 {
            return Err(ConfigError::Invalid(
                "metrics.sample_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
