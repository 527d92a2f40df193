//! Classification intake route.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ProxyError;
use crate::scheduler::Ticket;
use crate::state::AppState;

/// Tenant header; requests without it are scheduled under `"default"`.
pub const TENANT_HEADER: &str = "x-customer-id";

/// Classify a single item through the batching scheduler
///
/// POST /proxy_classify
///
/// The handler never calls downstream directly: it builds a ticket,
/// enqueues it and suspends on the completion handle until the dispatcher
/// publishes the outcome. The response is the downstream item-result with
/// `proxy_latency_ms` merged in.
pub async fn proxy_classify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    let started = Instant::now();

    let Json(payload) = body.map_err(|e| ProxyError::BadRequest(e.to_string()))?;
    let tenant = tenant_from_headers(&headers);

    let (ticket, done) = Ticket::new(tenant.clone(), payload);
    debug!(tenant = %tenant, size = ticket.size, "enqueuing ticket");

    state.metrics.record_received();
    state.queue.enqueue(ticket);

    // If this task is cancelled here, the ticket stays dispatch-eligible
    // and its eventual outcome is dropped with the receiver.
    let outcome = done
        .await
        .map_err(|_| ProxyError::Internal("completion handle dropped unsignalled".to_string()))?;
    let result = outcome?;

    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    Ok(Json(merge_latency(result, latency_ms)))
}

fn tenant_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("default")
        .to_string()
}

/// Merge the measured latency into the item-result. Object results gain the
/// field in place; anything else is wrapped.
fn merge_latency(result: Value, latency_ms: f64) -> Value {
    match result {
        Value::Object(mut map) => {
            map.insert("proxy_latency_ms".to_string(), json!(latency_ms));
            Value::Object(map)
        }
        other => json!({ "result": other, "proxy_latency_ms": latency_ms }),
    }
}
