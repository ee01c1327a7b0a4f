//! Breakpoint grouping and per-group sampling of page metrics.
//!
//! # Grouping
//!
//! ```text
//! breakpoints = [b0, b1, ..., bn-1]   (ascending)
//! groups      = n + 1
//!
//! group i < n : width <= bi
//! group n     : width >  bn-1
//! ```
//!
//! In [`GroupingMode::Inclusive`] a record joins the overflow group when it
//! is wider than the largest breakpoint, and then joins *every* group whose
//! boundary it does not exceed. With several breakpoints a narrow record is
//! therefore a member of several groups. [`GroupingMode::Exclusive`] places
//! each record in the single group returned by [`classify`].
//!
//! # Sampling
//!
//! Records arrive newest-first. Each group keeps its input order and is cut
//! down to `sample_size`, dropping the oldest entries.

use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::types::PageMetric;

/// How records are assigned to breakpoint groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Overflow test plus every inclusive boundary test.
    #[default]
    Inclusive,
    /// One group per record, the smallest matching boundary.
    Exclusive,
}

/// Index of the group a viewport width falls into.
///
/// Returns the smallest `i` with `width <= breakpoints[i]`, or
/// `breakpoints.len()` when the width exceeds every boundary. `breakpoints`
/// must be sorted ascending.
pub fn classify(width: u32, breakpoints: &[u32]) -> usize {
    breakpoints
        .iter()
        .position(|&max_width| width <= max_width)
        .unwrap_or(breakpoints.len())
}

/// Partition records into `breakpoints.len() + 1` groups, keeping input order.
pub fn group_by_breakpoint(
    metrics: &[PageMetric],
    breakpoints: &[u32],
    mode: GroupingMode,
) -> Vec<Vec<PageMetric>> {
    let max_index = breakpoints.len();
    let mut groups = vec![Vec::new(); max_index + 1];

    for metric in metrics {
        let width = metric.viewport.width;
        match mode {
            GroupingMode::Exclusive => {
                groups[classify(width, breakpoints)].push(metric.clone());
            }
            GroupingMode::Inclusive => {
                let overflows = breakpoints.last().is_none_or(|&largest| width > largest);
                if overflows {
                    groups[max_index].push(metric.clone());
                }
                for (group, &max_width) in breakpoints.iter().enumerate() {
                    if width <= max_width {
                        groups[group].push(metric.clone());
                    }
                }
            }
        }
    }

    groups
}

/// Group records by breakpoint and keep at most `sample_size` per group.
pub fn group_and_sample(metrics: &[PageMetric], config: &MetricsConfig) -> UrlMetricsGroups {
    let config = config.normalized();
    let grouped = group_by_breakpoint(metrics, &config.breakpoints, config.grouping);

    let groups = grouped
        .into_iter()
        .enumerate()
        .map(|(index, mut metrics)| {
            metrics.truncate(config.sample_size);
            let minimum_viewport_width = match index {
                0 => 0,
                i => config.breakpoints[i - 1].saturating_add(1),
            };
            UrlMetricsGroup {
                minimum_viewport_width,
                maximum_viewport_width: config.breakpoints.get(index).copied(),
                sample_size: config.sample_size,
                metrics,
            }
        })
        .collect();

    UrlMetricsGroups { groups }
}

/// A single breakpoint bucket of sampled page metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlMetricsGroup {
    pub minimum_viewport_width: u32,
    /// `None` for the overflow group.
    pub maximum_viewport_width: Option<u32>,
    pub sample_size: usize,
    /// Newest first.
    pub metrics: Vec<PageMetric>,
}

impl UrlMetricsGroup {
    /// Number of distinct records in the group.
    ///
    /// Inclusive grouping persists a record once per group it joined, so a
    /// regrouped sequence can hold exact copies of a single visit.
    pub fn distinct_samples(&self) -> usize {
        self.metrics
            .iter()
            .enumerate()
            .filter(|&(i, metric)| !self.metrics[..i].contains(metric))
            .count()
    }

    /// Whether the group already holds a full sample.
    pub fn is_complete(&self) -> bool {
        self.distinct_samples() >= self.sample_size
    }

    /// The LCP element XPath shared by every sample in the group.
    ///
    /// `None` when the group is empty, a sample has no LCP element, or the
    /// samples disagree.
    pub fn common_lcp_xpath(&self) -> Option<&str> {
        let (first, rest) = self.metrics.split_first()?;
        let xpath = first.lcp_xpath()?;
        rest.iter()
            .all(|m| m.lcp_xpath() == Some(xpath))
            .then_some(xpath)
    }
}

/// All breakpoint groups for one URL, in ascending width order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlMetricsGroups {
    groups: Vec<UrlMetricsGroup>,
}

impl UrlMetricsGroups {
    pub fn groups(&self) -> &[UrlMetricsGroup] {
        &self.groups
    }

    /// Concatenate the groups back into the flat sequence that gets persisted.
    pub fn flatten(&self) -> Vec<PageMetric> {
        self.groups
            .iter()
            .flat_map(|g| g.metrics.iter().cloned())
            .collect()
    }

    /// Indexes of groups that still want more samples.
    pub fn groups_needing_samples(&self) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.is_complete())
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether every group holds a full sample.
    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(UrlMetricsGroup::is_complete)
    }
}
