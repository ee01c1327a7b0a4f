//! detective-api — REST API for Optimization Detective.
//!
//! Provides axum route handlers for submitting page metrics and reading
//! back the grouped metrics for a URL.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/url-metrics:store` | Store a page metric for a URL |
//! | GET | `/api/v1/url-metrics?url=...` | Grouped metrics for a URL |
//! | GET | `/healthz` | Liveness probe |
//!
//! The router must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()` for the storage
//! lock to see peer addresses.

pub mod client;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use detective_core::DetectiveConfig;
use detective_state::{StateStore, SubmissionService};

pub use client::ClientAddress;
pub use error::ApiError;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: SubmissionService<StateStore>,
}

/// Build the complete API router.
pub fn build_router(store: StateStore, config: &DetectiveConfig) -> Router {
    let api_state = ApiState {
        service: SubmissionService::new(store, config),
    };

    let api_routes = Router::new()
        .route("/url-metrics:store", post(handlers::store_url_metric))
        .route("/url-metrics", get(handlers::get_url_metrics))
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
