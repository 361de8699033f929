use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::status::render_report;
use crate::store::SnapshotHandle;

/// Read-only HTTP surface over the shared snapshot.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: SnapshotHandle,
    pub flags: Arc<HashMap<String, String>>,
    pub metrics: Option<Metrics>,
}

impl AppState {
    pub fn new(snapshot: SnapshotHandle, flags: HashMap<String, String>) -> Self {
        Self {
            snapshot,
            flags: Arc::new(flags),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthResp {
    status: &'static str,
    listings: usize,
    regions: usize,
    refreshed_at: Option<DateTime<Utc>>,
    failure_streak: u32,
}

async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    let view = state.snapshot.read().await;
    Json(HealthResp {
        status: "ok",
        listings: view.snapshot.len(),
        regions: view.snapshot.regions().count(),
        refreshed_at: view.refreshed_at,
        failure_streak: view.failure_streak,
    })
}

async fn status(State(state): State<AppState>) -> String {
    let snap = state.snapshot.snapshot().await;
    render_report(&snap, &state.flags)
}

async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(Metrics::render)
        .ok_or(StatusCode::NOT_FOUND)
}
