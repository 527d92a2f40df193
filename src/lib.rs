//! Batching proxy library.
//!
//! A request-admission proxy that groups concurrent single-item
//! classification requests into micro-batches before forwarding them to a
//! downstream service whose per-call cost grows with the largest item in a
//! batch. The batch-formation policy (SJF, FAIR or FCFS) is switchable at
//! runtime through a control endpoint.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod downstream;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use error::ProxyError;
pub use scheduler::Strategy;
pub use state::{AppState, ProxyConfig};

/// Build the proxy router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/proxy_classify", post(routes::proxy_classify))
        .route("/strategy", get(routes::get_strategy).post(routes::set_strategy))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy server.
///
/// Spawns the dispatcher task and blocks serving HTTP until shutdown.
pub async fn run_server(config: ProxyConfig) -> anyhow::Result<()> {
    info!(
        port = config.port,
        downstream_url = %config.downstream_url,
        max_batch = config.max_batch,
        strategy = config.initial_strategy.as_str(),
        "Starting batching proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState::new(config.clone()));

    tokio::spawn(scheduler::run_dispatcher(state.clone()));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Proxy listening on http://{}", addr);
    info!("Classify:  POST http://{}/proxy_classify", addr);
    info!("Strategy:  GET/POST http://{}/strategy", addr);
    info!("Health:    GET http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
