//! SubmissionService — the full path from a client submission to storage.

use detective_core::config::DetectiveConfig;
use detective_core::{client_lock_key, UrlMetricSubmission};
use tracing::warn;

use crate::error::SubmitError;
use crate::lock::StorageLock;
use crate::metrics::{MetricsStore, SubmitOutcome};
use crate::repository::{LockRepository, UrlMetricsRepository};

/// Validates, rate-limits, and stores page-metric submissions.
#[derive(Clone)]
pub struct SubmissionService<S> {
    metrics: MetricsStore<S>,
    lock: StorageLock<S>,
}

impl<S> SubmissionService<S>
where
    S: UrlMetricsRepository + LockRepository + Clone,
{
    pub fn new(store: S, config: &DetectiveConfig) -> Self {
        Self {
            metrics: MetricsStore::new(store.clone(), config.metrics.clone()),
            lock: StorageLock::new(store, config.lock.ttl_secs),
        }
    }

    pub fn metrics(&self) -> &MetricsStore<S> {
        &self.metrics
    }

    /// Store a submission from `client_address` at `now`.
    ///
    /// The client is locked only after the metric is persisted, so a failed
    /// write does not cost it its submission window. Once the metric is
    /// committed the submission succeeds even if the lock cannot be recorded.
    pub fn submit(
        &self,
        submission: UrlMetricSubmission,
        client_address: &str,
        now: u64,
    ) -> Result<SubmitOutcome, SubmitError> {
        submission.validate()?;

        let client_key = client_lock_key(client_address);
        if self.lock.is_locked(&client_key, now).map_err(SubmitError::Persist)? {
            warn!(url = %submission.url, "page metric rejected: storage locked for client");
            return Err(SubmitError::LockConflict);
        }

        let (url, metric) = submission.into_page_metric(now);
        let outcome = self
            .metrics
            .submit(&url, metric, now)
            .map_err(SubmitError::Persist)?;

        if let Err(e) = self.lock.acquire(&client_key, now) {
            warn!(url = %url, error = %e, "page metric stored but storage lock not recorded");
        }

        Ok(outcome)
    }
}
