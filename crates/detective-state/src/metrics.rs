//! MetricsStore — merges submitted page metrics into per-URL storage.
//!
//! Each submission is prepended to the URL's stored sequence, the whole
//! sequence is regrouped by breakpoint and sampled, and the result replaces
//! the stored document. Corrupt stored content is discarded rather than
//! blocking new writes.
//!
//! There is no locking across requests: two submissions for the same URL
//! can race, and the last write wins.

use detective_core::config::MetricsConfig;
use detective_core::{
    group_and_sample, parse_stored_metrics, serialize_metrics, url_slug, PageMetric, ParseError,
    UrlMetricsGroups,
};
use tracing::{info, warn};

use crate::error::{LoadError, StateError, StateResult};
use crate::repository::UrlMetricsRepository;
use crate::types::UrlMetricsDocument;

/// Grouped, sampled metrics for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlMetrics {
    pub slug: String,
    pub url: String,
    pub groups: UrlMetricsGroups,
}

/// What the submission found in storage before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    /// No document existed for the URL.
    Created,
    /// The stored document parsed; it held `previous` records.
    Merged { previous: usize },
    /// The stored document was corrupt and was replaced.
    Recovered(ParseError),
}

impl History {
    pub fn label(&self) -> &'static str {
        match self {
            History::Created => "created",
            History::Merged { .. } => "merged",
            History::Recovered(_) => "recovered",
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub url_metrics: UrlMetrics,
    pub history: History,
}

#[derive(Clone)]
pub struct MetricsStore<R> {
    repo: R,
    config: MetricsConfig,
}

impl<R: UrlMetricsRepository> MetricsStore<R> {
    pub fn new(repo: R, config: MetricsConfig) -> Self {
        Self {
            repo,
            config: config.normalized(),
        }
    }

    /// Merge `metric` into the stored metrics for `url`.
    ///
    /// The metric is stamped with `now`. Storage failures are returned;
    /// unreadable stored content is reported through [`History::Recovered`].
    pub fn submit(&self, url: &str, mut metric: PageMetric, now: u64) -> StateResult<SubmitOutcome> {
        let slug = url_slug(url);

        let (mut metrics, history) = match self.repo.find(&slug)? {
            None => (Vec::new(), History::Created),
            Some(doc) => match parse_stored_metrics(&doc.content) {
                Ok(metrics) => {
                    let previous = metrics.len();
                    (metrics, History::Merged { previous })
                }
                Err(e) => {
                    warn!(%slug, %url, error = %e, "discarding unreadable stored page metrics");
                    (Vec::new(), History::Recovered(e))
                }
            },
        };

        metric.timestamp = now;
        metrics.insert(0, metric);

        let groups = group_and_sample(&metrics, &self.config);
        let content = serialize_metrics(&groups.flatten())
            .map_err(|e| StateError::Serialize(e.to_string()))?;

        self.repo.save(&UrlMetricsDocument {
            slug: slug.clone(),
            title: url.to_string(),
            content,
            modified_at: now,
        })?;

        info!(%slug, %url, history = history.label(), "page metric stored");

        Ok(SubmitOutcome {
            url_metrics: UrlMetrics {
                slug,
                url: url.to_string(),
                groups,
            },
            history,
        })
    }

    /// Read and group the stored metrics for `url`.
    ///
    /// Unlike [`submit`](Self::submit), corrupt content is an error here.
    pub fn load(&self, url: &str) -> Result<Option<UrlMetrics>, LoadError> {
        let slug = url_slug(url);
        let Some(doc) = self.repo.find(&slug)? else {
            return Ok(None);
        };
        let metrics = parse_stored_metrics(&doc.content)?;
        Ok(Some(UrlMetrics {
            slug,
            url: doc.title,
            groups: group_and_sample(&metrics, &self.config),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateStore;
    use detective_core::{GroupingMode, Viewport};

    fn metric(width: u32) -> PageMetric {
        PageMetric {
            viewport: Viewport { width, height: 800 },
            elements: Vec::new(),
            timestamp: 0,
        }
    }

    fn store_with(breakpoints: Vec<u32>, sample_size: usize) -> (StateStore, MetricsStore<StateStore>) {
        let state = StateStore::open_in_memory().unwrap();
        let config = MetricsConfig {
            breakpoints,
            sample_size,
            grouping: GroupingMode::Inclusive,
        };
        (state.clone(), MetricsStore::new(state, config))
    }

    fn stored_widths(state: &StateStore, url: &str) -> Vec<u32> {
        let doc = state.get_url_metrics(&url_slug(url)).unwrap().unwrap();
        parse_stored_metrics(&doc.content)
            .unwrap()
            .iter()
            .map(|m| m.viewport.width)
            .collect()
    }

    const URL: &str = "https://example.com/";

    #[test]
    fn first_submission_creates_document() {
        let (state, store) = store_with(vec![480], 10);
        let outcome = store.submit(URL, metric(400), 1000).unwrap();

        assert_eq!(outcome.history, History::Created);
        assert_eq!(outcome.url_metrics.slug, url_slug(URL));

        let doc = state.get_url_metrics(&url_slug(URL)).unwrap().unwrap();
        assert_eq!(doc.title, URL);
        assert_eq!(doc.modified_at, 1000);
        let stored = parse_stored_metrics(&doc.content).unwrap();
        assert_eq!(stored[0].timestamp, 1000);
    }

    #[test]
    fn samples_newest_per_breakpoint() {
        let (state, store) = store_with(vec![480], 2);
        store.submit(URL, metric(400), 1).unwrap();
        store.submit(URL, metric(450), 2).unwrap();
        let outcome = store.submit(URL, metric(500), 3).unwrap();

        assert_eq!(outcome.history, History::Merged { previous: 2 });
        assert_eq!(stored_widths(&state, URL), vec![450, 400, 500]);

        store.submit(URL, metric(300), 4).unwrap();
        assert_eq!(stored_widths(&state, URL), vec![300, 450, 500]);
    }

    #[test]
    fn every_group_stays_within_sample_size() {
        let (_, store) = store_with(vec![320, 480, 576], 3);
        for (i, width) in [200, 700, 400, 500, 300, 800, 450, 560, 900, 100, 330, 1000]
            .into_iter()
            .enumerate()
        {
            let outcome = store.submit(URL, metric(width), i as u64).unwrap();
            for group in outcome.url_metrics.groups.groups() {
                assert!(group.metrics.len() <= 3);
            }
        }
    }

    #[test]
    fn inclusive_grouping_persists_every_membership() {
        let (state, store) = store_with(vec![320, 480], 10);
        store.submit(URL, metric(300), 1).unwrap();
        // 300 fits both the <=320 and the <=480 group.
        assert_eq!(stored_widths(&state, URL), vec![300, 300]);

        let (state, store) = {
            let state = StateStore::open_in_memory().unwrap();
            let config = MetricsConfig {
                breakpoints: vec![320, 480],
                sample_size: 10,
                grouping: GroupingMode::Exclusive,
            };
            (state.clone(), MetricsStore::new(state, config))
        };
        store.submit(URL, metric(300), 1).unwrap();
        assert_eq!(stored_widths(&state, URL), vec![300]);
    }

    #[test]
    fn corrupt_content_is_recovered_as_empty_history() {
        let (state, store) = store_with(vec![480], 10);
        state
            .put_url_metrics(&UrlMetricsDocument {
                slug: url_slug(URL),
                title: URL.to_string(),
                content: "{oops".to_string(),
                modified_at: 1,
            })
            .unwrap();

        let outcome = store.submit(URL, metric(400), 2).unwrap();
        assert!(matches!(outcome.history, History::Recovered(ParseError::Malformed(_))));
        assert_eq!(stored_widths(&state, URL), vec![400]);
    }

    #[test]
    fn non_array_content_is_recovered_as_empty_history() {
        let (state, store) = store_with(vec![480], 10);
        state
            .put_url_metrics(&UrlMetricsDocument {
                slug: url_slug(URL),
                title: URL.to_string(),
                content: r#"{"viewport": {"width": 1}}"#.to_string(),
                modified_at: 1,
            })
            .unwrap();

        let outcome = store.submit(URL, metric(400), 2).unwrap();
        assert_eq!(outcome.history, History::Recovered(ParseError::NotAnArray("object")));
    }

    #[test]
    fn unreadable_entries_do_not_discard_history() {
        let (state, store) = store_with(vec![480], 10);
        let content = serde_json::json!([
            {"viewport": {"width": 400, "height": 800}, "elements": [], "timestamp": 1},
            {"legacy": true}
        ])
        .to_string();
        state
            .put_url_metrics(&UrlMetricsDocument {
                slug: url_slug(URL),
                title: URL.to_string(),
                content,
                modified_at: 1,
            })
            .unwrap();

        let outcome = store.submit(URL, metric(300), 2).unwrap();
        assert_eq!(outcome.history, History::Merged { previous: 1 });
        assert_eq!(stored_widths(&state, URL), vec![300, 400]);
    }

    #[test]
    fn inclusive_copies_do_not_complete_groups_on_load() {
        let (_, store) = store_with(vec![320, 480], 2);
        store.submit(URL, metric(300), 1).unwrap();

        let loaded = store.load(URL).unwrap().unwrap();
        let groups = loaded.groups.groups();
        // One visit, stored once per matching group.
        assert_eq!(groups[0].metrics.len(), 2);
        assert_eq!(groups[0].distinct_samples(), 1);
        assert!(!groups[0].is_complete());
        assert!(!groups[1].is_complete());
        assert_eq!(loaded.groups.groups_needing_samples(), vec![0, 1, 2]);

        store.submit(URL, metric(310), 2).unwrap();
        let loaded = store.load(URL).unwrap().unwrap();
        assert!(loaded.groups.groups()[0].is_complete());
        assert!(loaded.groups.groups()[1].is_complete());
        assert_eq!(loaded.groups.groups_needing_samples(), vec![2]);
    }

    #[test]
    fn load_regroups_stored_metrics() {
        let (_, store) = store_with(vec![480], 10);
        assert!(store.load(URL).unwrap().is_none());

        store.submit(URL, metric(400), 1).unwrap();
        store.submit(URL, metric(900), 2).unwrap();

        let loaded = store.load(URL).unwrap().unwrap();
        assert_eq!(loaded.url, URL);
        assert_eq!(loaded.groups.groups()[0].metrics.len(), 1);
        assert_eq!(loaded.groups.groups()[1].metrics.len(), 1);
    }

    #[test]
    fn load_reports_corrupt_content() {
        let (state, store) = store_with(vec![480], 10);
        state
            .put_url_metrics(&UrlMetricsDocument {
                slug: url_slug(URL),
                title: URL.to_string(),
                content: "null".to_string(),
                modified_at: 1,
            })
            .unwrap();

        assert!(matches!(
            store.load(URL),
            Err(LoadError::Parse(ParseError::NotAnArray("null")))
        ));
    }

    struct FailingRepo;

    impl UrlMetricsRepository for FailingRepo {
        fn find(&self, _slug: &str) -> StateResult<Option<UrlMetricsDocument>> {
            Ok(None)
        }

        fn save(&self, _doc: &UrlMetricsDocument) -> StateResult<()> {
            Err(StateError::Write("disk full".to_string()))
        }
    }

    #[test]
    fn persist_failure_is_propagated() {
        let store = MetricsStore::new(FailingRepo, MetricsConfig::default());
        let err = store.submit(URL, metric(400), 1).unwrap_err();
        assert!(matches!(err, StateError::Write(_)));
    }
}
