//! REST API handlers.
//!
//! Each handler goes through the `SubmissionService` and returns JSON
//! responses in a `{success, data, error}` envelope.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use detective_core::{PageMetric, UrlMetricSubmission, UrlMetricsGroup};
use detective_state::{History, UrlMetrics};

use crate::ApiState;
use crate::client::ClientAddress;
use crate::error::ApiError;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Body of a successful store.
#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub slug: String,
    pub url: String,
    /// Records persisted for the URL after this submission.
    pub stored: usize,
    /// `created`, `merged` or `recovered`.
    pub history: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded: Option<String>,
    pub groups_needing_samples: Vec<usize>,
}

/// One breakpoint group as returned to readers.
#[derive(Debug, Serialize)]
pub struct GroupView {
    pub minimum_viewport_width: u32,
    pub maximum_viewport_width: Option<u32>,
    pub complete: bool,
    pub lcp_xpath: Option<String>,
    pub metrics: Vec<PageMetric>,
}

impl From<&UrlMetricsGroup> for GroupView {
    fn from(group: &UrlMetricsGroup) -> Self {
        Self {
            minimum_viewport_width: group.minimum_viewport_width,
            maximum_viewport_width: group.maximum_viewport_width,
            complete: group.is_complete(),
            lcp_xpath: group.common_lcp_xpath().map(str::to_string),
            metrics: group.metrics.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UrlMetricsView {
    pub slug: String,
    pub url: String,
    pub complete: bool,
    pub groups: Vec<GroupView>,
}

impl From<UrlMetrics> for UrlMetricsView {
    fn from(metrics: UrlMetrics) -> Self {
        Self {
            complete: metrics.groups.is_complete(),
            groups: metrics.groups.groups().iter().map(GroupView::from).collect(),
            slug: metrics.slug,
            url: metrics.url,
        }
    }
}

// ── URL metrics ────────────────────────────────────────────────

/// POST /api/v1/url-metrics:store
pub async fn store_url_metric(
    State(state): State<ApiState>,
    ClientAddress(client): ClientAddress,
    payload: Result<Json<UrlMetricSubmission>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(submission) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let outcome = state.service.submit(submission, &client, epoch_secs())?;

    let discarded = match &outcome.history {
        History::Recovered(e) => Some(e.to_string()),
        _ => None,
    };
    let body = StoreResponse {
        stored: outcome.url_metrics.groups.flatten().len(),
        history: outcome.history.label(),
        discarded,
        groups_needing_samples: outcome.url_metrics.groups.groups_needing_samples(),
        slug: outcome.url_metrics.slug,
        url: outcome.url_metrics.url,
    };
    Ok(ApiResponse::ok(body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// GET /api/v1/url-metrics?url=...
pub async fn get_url_metrics(
    State(state): State<ApiState>,
    Query(query): Query<UrlQuery>,
) -> Result<Response, ApiError> {
    match state.service.metrics().load(&query.url)? {
        Some(metrics) => Ok(ApiResponse::ok(UrlMetricsView::from(metrics)).into_response()),
        None => Err(ApiError::NotFound(format!("no url metrics for {}", query.url))),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
