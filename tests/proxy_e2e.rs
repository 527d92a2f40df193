//! End-to-end tests: a live proxy in front of a stub classification server.
//!
//! The stub records every batch it receives, so these tests can check both
//! the caller-visible contract and the batching invariants from outside.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use batchproxy::{router, AppState, ProxyConfig, Strategy};

/// Batches observed by the stub downstream, in arrival order.
type BatchLog = Arc<Mutex<Vec<Vec<Value>>>>;

async fn stub_classify(
    State(log): State<BatchLog>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let items = body["sequences"].as_array().cloned().unwrap_or_default();
    log.lock().await.push(items.clone());

    let results: Vec<Value> = items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) => json!(format!("echo:{s}")),
            None => json!("not code"),
        })
        .collect();
    Json(json!({ "results": results }))
}

/// Serve a stub downstream; returns its address and the batch log.
async fn spawn_stub() -> (SocketAddr, BatchLog) {
    let log: BatchLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/classify", post(stub_classify))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

/// Serve a stub downstream that always fails with a 500.
async fn spawn_failing_stub() -> SocketAddr {
    let app = Router::new().route(
        "/classify",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start a full proxy (dispatcher included) against the given downstream.
async fn spawn_proxy(downstream: SocketAddr, strategy: Strategy) -> SocketAddr {
    let config = ProxyConfig {
        downstream_url: format!("http://{downstream}/classify"),
        initial_strategy: strategy,
        ..Default::default()
    };
    let state = Arc::new(AppState::new(config));
    tokio::spawn(batchproxy::scheduler::run_dispatcher(state.clone()));

    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_classify_round_trip_with_latency() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{proxy}/proxy_classify"))
        .header("X-Customer-Id", "A")
        .json(&json!("fn main() {}"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], "echo:fn main() {}");
    assert!(body["proxy_latency_ms"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_request_without_tenant_header_is_served() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fair).await;
    let client = reqwest::Client::new();

    // no X-Customer-Id: scheduled under the "default" tenant
    let response = client
        .post(format!("http://{proxy}/proxy_classify"))
        .json(&json!("hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], "echo:hello");
}

#[tokio::test]
async fn test_burst_never_exceeds_max_batch() {
    let (downstream, log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();

    let mut calls = Vec::new();
    for i in 0..12 {
        let client = client.clone();
        let url = format!("http://{proxy}/proxy_classify");
        calls.push(tokio::spawn(async move {
            client
                .post(url)
                .header("X-Customer-Id", "A")
                .json(&json!(format!("item-{i}")))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for call in calls {
        assert_eq!(call.await.unwrap(), 200);
    }

    let batches = log.lock().await;
    let total: usize = batches.iter().map(|b| b.len()).sum();
    assert_eq!(total, 12, "every ticket dispatched exactly once");
    for batch in batches.iter() {
        assert!(!batch.is_empty());
        assert!(batch.len() <= 5, "batch of {} exceeds MAX_BATCH", batch.len());
    }
}

#[tokio::test]
async fn test_downstream_failure_fans_out_to_all_callers() {
    let downstream = spawn_failing_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();

    let mut calls = Vec::new();
    for i in 0..3 {
        let client = client.clone();
        let url = format!("http://{proxy}/proxy_classify");
        calls.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&json!(format!("item-{i}")))
                .send()
                .await
                .unwrap()
        }));
    }

    for call in calls {
        let response = call.await.unwrap();
        assert_eq!(response.status(), 502);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["type"], "DownstreamProtocol");
    }
}

#[tokio::test]
async fn test_strategy_round_trip_and_idempotence() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();
    let url = format!("http://{proxy}/strategy");

    let response = client.get(&url).send().await.unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["active_strategy"], "fcfs");

    // set, read back, set again: same answer all three times
    for _ in 0..2 {
        let response = client.post(&url).json(&json!("sjf")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["active_strategy"], "sjf");
    }

    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["active_strategy"], "sjf");
}

#[tokio::test]
async fn test_strategy_is_case_insensitive_and_rejects_unknown() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();
    let url = format!("http://{proxy}/strategy");

    let response = client.post(&url).json(&json!("FAIR")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let response = client.post(&url).json(&json!("priority")).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "BadRequest");

    // the failed switch left the previous strategy in place
    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["active_strategy"], "fair");
}

#[tokio::test]
async fn test_malformed_intake_body_is_rejected() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{proxy}/proxy_classify"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_health_reports_active_strategy() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fair).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("http://{proxy}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_strategy"], "fair");
}

#[tokio::test]
async fn test_metrics_track_dispatches() {
    let (downstream, _log) = spawn_stub().await;
    let proxy = spawn_proxy(downstream, Strategy::Fcfs).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{proxy}/proxy_classify"))
        .json(&json!("hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = client
        .get(format!("http://{proxy}/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["tickets_received"], 1);
    assert_eq!(body["tickets_completed"], 1);
    assert!(body["batches_dispatched"].as_u64().unwrap() >= 1);
}
