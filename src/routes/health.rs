//! Health and metrics endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "active_strategy": state.strategy.load().as_str(),
        "queue_depth": state.queue.len(),
        "downstream_url": state.downstream.url(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Scheduler counters
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
