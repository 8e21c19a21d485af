//! Shared fixtures: local fake endpoints and a recording runner.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use iobench::config::BenchConfig;
use iobench::runner::Orchestrator;
use iobench::system::StaticMetrics;
use iobench::telemetry::{Event, EventKind, EventLogger, LoggerOptions, MemorySink};

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// ---------------------------------------------------------------------------
// Fake price API
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct PriceServer {
    failing: Arc<Vec<String>>,
    /// Applied before answering a failing symbol.
    fail_delay: Duration,
    hits: Arc<Mutex<Vec<String>>>,
}

impl PriceServer {
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn ticker(
    State(state): State<PriceServer>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let symbol = query.get("symbol").cloned().unwrap_or_default();
    state.hits.lock().unwrap().push(symbol.clone());
    if state.failing.contains(&symbol) {
        tokio::time::sleep(state.fail_delay).await;
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(json!({ "symbol": symbol, "price": "123.45000000" })))
}

/// Returns the ticker URL and a handle to inspect requests.
pub async fn spawn_price_server(failing: &[&str]) -> (String, PriceServer) {
    spawn_slow_price_server(failing, Duration::ZERO).await
}

/// Like [`spawn_price_server`], but failing symbols answer after `fail_delay`.
pub async fn spawn_slow_price_server(
    failing: &[&str],
    fail_delay: Duration,
) -> (String, PriceServer) {
    let state = PriceServer {
        failing: Arc::new(failing.iter().map(|s| s.to_string()).collect()),
        fail_delay,
        hits: Arc::default(),
    };
    let router = Router::new()
        .route("/api/v3/ticker/price", get(ticker))
        .with_state(state.clone());
    let addr = serve(router).await;
    (format!("http://{}/api/v3/ticker/price", addr), state)
}

// ---------------------------------------------------------------------------
// Fake log endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoggedRequest {
    pub run_tag: String,
    pub server_id: String,
    pub event: String,
    pub params: HashMap<String, String>,
}

#[derive(Clone)]
pub struct LogServer {
    status: StatusCode,
    received: Arc<Mutex<Vec<LoggedRequest>>>,
}

impl LogServer {
    pub fn received(&self) -> Vec<LoggedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<LogServer>,
    UrlPath((run_tag, server_id, event)): UrlPath<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    state.received.lock().unwrap().push(LoggedRequest {
        run_tag,
        server_id,
        event,
        params,
    });
    state.status
}

/// Returns the log base URL and a handle to inspect requests.
pub async fn spawn_log_server(status: StatusCode) -> (String, LogServer) {
    let state = LogServer {
        status,
        received: Arc::default(),
    };
    let router = Router::new()
        .route("/log/{run_tag}/{server_id}/{event}", get(record))
        .with_state(state.clone());
    let addr = serve(router).await;
    (format!("http://{}/log", addr), state)
}

// ---------------------------------------------------------------------------
// Runner fixtures
// ---------------------------------------------------------------------------

pub fn test_config(scratch_root: &Path, price_url: &str, runs: u32) -> BenchConfig {
    let mut cfg = BenchConfig::default();
    cfg.server.id = "9".to_string();
    cfg.server.ip = "192.0.2.9".to_string();
    cfg.runs.count = runs;
    cfg.runs.delay_between_runs_secs = 0;
    cfg.log_endpoint.base_url = String::new();
    cfg.log_endpoint.collect_metrics = false;
    cfg.log_endpoint.drain_timeout_secs = 5;
    cfg.price_api.base_url = price_url.to_string();
    cfg.price_api.timeout_secs = 5;
    cfg.file_io.scratch_root = scratch_root.to_path_buf();
    cfg.file_io.payload_repeat = 1000;
    cfg
}

/// Runner whose events land in the returned sink.
pub fn recording_orchestrator(config: BenchConfig) -> (Orchestrator, MemorySink) {
    let sink = MemorySink::new();
    let logger = EventLogger::spawn(
        config.run_tag(),
        Arc::new(sink.clone()),
        Arc::new(StaticMetrics::default()),
        LoggerOptions::default(),
    );
    (Orchestrator::new(config, logger).unwrap(), sink)
}

pub fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

pub fn dir_entries(path: &Path) -> usize {
    std::fs::read_dir(path).unwrap().count()
}
