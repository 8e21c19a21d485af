//! Event dispatch over HTTP against a local fake log endpoint.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

use iobench::runner::FiringStatus;
use iobench::system::{StaticMetrics, SystemMetrics};
use iobench::telemetry::{
    Event, EventKind, EventLogger, EventParams, EventSink, HttpSink, LoggerOptions,
};

use common::{spawn_log_server, spawn_price_server, test_config};

fn http_logger(base_url: &str, run_tag: &str) -> EventLogger {
    let sink = HttpSink::new(base_url, Duration::from_secs(5)).unwrap();
    EventLogger::spawn(
        run_tag,
        Arc::new(sink),
        Arc::new(StaticMetrics(SystemMetrics {
            cpu_percent: 12.5,
            memory_percent: 40.0,
        })),
        LoggerOptions::default(),
    )
}

#[tokio::test]
async fn test_events_reach_endpoint_with_metrics() {
    let (base_url, server) = spawn_log_server(StatusCode::OK).await;
    let logger = http_logger(&base_url, "15:22-20");

    logger.log(
        "1",
        EventKind::NetworkCallSymbolEnd,
        EventParams::now()
            .with("run_number", 2)
            .with("symbol", "BTCUSDT")
            .with("duration", 0.25),
    );
    let stats = logger.shutdown(Duration::from_secs(5)).await;
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 0);

    let received = server.received();
    assert_eq!(received.len(), 1);
    let req = &received[0];
    assert_eq!(req.run_tag, "15:22-20");
    assert_eq!(req.server_id, "1");
    assert_eq!(req.event, "NETWORK_CALL_SYMBOL_END");
    assert_eq!(req.params.get("run_number").map(String::as_str), Some("2"));
    assert_eq!(req.params.get("symbol").map(String::as_str), Some("BTCUSDT"));
    assert_eq!(req.params.get("duration").map(String::as_str), Some("0.25"));
    assert_eq!(req.params.get("cpu_percent").map(String::as_str), Some("12.5"));
    assert_eq!(req.params.get("memory_percent").map(String::as_str), Some("40.0"));
    assert!(req.params.contains_key("timestamp"));
}

#[tokio::test]
async fn test_server_errors_are_swallowed_and_counted() {
    let (base_url, server) = spawn_log_server(StatusCode::INTERNAL_SERVER_ERROR).await;
    let logger = http_logger(&base_url, "t");

    for kind in [EventKind::CronStart, EventKind::RunStart, EventKind::CronEnd] {
        logger.log("1", kind, EventParams::now());
    }
    let stats = logger.shutdown(Duration::from_secs(5)).await;

    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.delivered, 0);
    assert_eq!(server.received().len(), 3);
}

#[tokio::test]
async fn test_http_sink_reports_status_failures() {
    let (base_url, _server) = spawn_log_server(StatusCode::SERVICE_UNAVAILABLE).await;
    let sink = HttpSink::new(&base_url, Duration::from_secs(5)).unwrap();
    let event = Event {
        run_tag: "t".to_string(),
        server_id: "1".to_string(),
        kind: EventKind::CronStart,
        params: EventParams::new(),
    };
    assert!(sink.deliver(&event).await.is_err());
}

#[tokio::test]
async fn test_http_sink_requires_2xx() {
    let event = Event {
        run_tag: "t".to_string(),
        server_id: "1".to_string(),
        kind: EventKind::RunEnd,
        params: EventParams::new(),
    };

    let (not_modified, _server) = spawn_log_server(StatusCode::NOT_MODIFIED).await;
    let sink = HttpSink::new(&not_modified, Duration::from_secs(5)).unwrap();
    assert!(sink.deliver(&event).await.is_err());

    let (no_content, server) = spawn_log_server(StatusCode::NO_CONTENT).await;
    let sink = HttpSink::new(&no_content, Duration::from_secs(5)).unwrap();
    assert!(sink.deliver(&event).await.is_ok());
    assert_eq!(server.received().len(), 1);
}

struct StallingSink;

#[async_trait::async_trait]
impl EventSink for StallingSink {
    async fn deliver(&self, _event: &Event) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_stalled_endpoint_never_blocks_caller() {
    let logger = EventLogger::spawn(
        "t",
        Arc::new(StallingSink),
        Arc::new(StaticMetrics::default()),
        LoggerOptions {
            max_in_flight: 2,
            queue_capacity: 64,
        },
    );

    let started = Instant::now();
    for _ in 0..200 {
        logger.log("1", EventKind::FileIoStart, EventParams::now());
    }
    assert!(started.elapsed() < Duration::from_millis(500));

    let started = Instant::now();
    let stats = logger.shutdown(Duration::from_millis(100)).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.submitted + stats.dropped, 200);
}

#[tokio::test]
async fn test_failing_log_endpoint_does_not_affect_firing() {
    let root = tempfile::tempdir().unwrap();
    let (price_url, _prices) = spawn_price_server(&[]).await;
    let (log_url, log_server) = spawn_log_server(StatusCode::INTERNAL_SERVER_ERROR).await;

    let mut config = test_config(root.path(), &price_url, 1);
    config.log_endpoint.base_url = log_url;
    let report = iobench::run_once(config).await.unwrap();

    assert_eq!(report.status, FiringStatus::Completed);
    assert_eq!(report.runs.len(), 1);
    assert_eq!(report.runs[0].symbols_failed, 0);
    assert!(report.runs[0].file_ok);
    assert!(report.scratch_removed);

    // Every event was still attempted against the endpoint.
    let received = log_server.received();
    assert_eq!(received.len(), 20);
    assert!(received.iter().all(|r| r.server_id == "9" && r.run_tag == "15:22-1"));
}
