//! Control surface for the active strategy.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ProxyError;
use crate::scheduler::Strategy;
use crate::state::AppState;

/// Read the active strategy
///
/// GET /strategy
pub async fn get_strategy(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "active_strategy": state.strategy.load().as_str() }))
}

/// Switch the active strategy
///
/// POST /strategy — body is a JSON string: "sjf" | "fair" | "fcfs"
/// (case-insensitive). Takes effect at the next batch formation.
pub async fn set_strategy(
    State(state): State<Arc<AppState>>,
    body: Result<Json<String>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    let Json(raw) = body.map_err(|e| ProxyError::BadRequest(e.to_string()))?;
    let strategy: Strategy = raw
        .parse()
        .map_err(|e: crate::scheduler::InvalidStrategy| ProxyError::BadRequest(e.to_string()))?;

    state.strategy.store(strategy);
    info!(strategy = strategy.as_str(), "strategy changed");

    Ok(Json(json!({ "active_strategy": strategy.as_str() })))
}
