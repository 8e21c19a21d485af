//! Fire-and-forget event logging.
//!
//! [`EventLogger::log`] never blocks and never fails: it pushes onto a
//! bounded queue with `try_send`. A dispatcher task drains the queue and runs
//! each delivery in its own task, at most `max_in_flight` at a time. System
//! metrics are sampled on that side, so neither sampling nor HTTP latency
//! shows up in benchmark timings. There is no retry and no ordering guarantee.

pub mod event;
pub mod sink;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::BenchConfig;
use crate::system::{MetricsSource, StaticMetrics, SysinfoMetrics, SystemMetrics};

pub use event::{unix_seconds, Event, EventKind, EventParams};
pub use sink::{ConsoleSink, EventSink, HttpSink, MemorySink};

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct LoggerOptions {
    pub max_in_flight: usize,
    pub queue_capacity: usize,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 50,
            queue_capacity: 1024,
        }
    }
}

/// Local counters. Never sent anywhere; reported once at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoggerStats {
    /// Accepted onto the queue.
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Rejected because the queue was full or already closed.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LoggerStats {
        LoggerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    run_tag: String,
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

/// Cloneable handle to the dispatch pool.
#[derive(Clone)]
pub struct EventLogger {
    inner: Arc<Inner>,
}

impl EventLogger {
    /// Build the sink and metrics source described by `config` and start the pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &BenchConfig) -> crate::error::Result<Self> {
        let endpoint = &config.log_endpoint;

        let sink: Arc<dyn EventSink> = match config.log_base_url() {
            Some(url) => {
                info!(%url, "logging events to remote endpoint");
                Arc::new(HttpSink::new(url, Duration::from_secs(endpoint.timeout_secs))?)
            }
            None => {
                info!("remote log endpoint disabled, logging events to console");
                Arc::new(ConsoleSink)
            }
        };

        let metrics: Arc<dyn MetricsSource> = if endpoint.collect_metrics {
            Arc::new(SysinfoMetrics::new(Duration::from_millis(
                endpoint.metrics_sample_ms,
            )))
        } else {
            Arc::new(StaticMetrics::default())
        };

        Ok(Self::spawn(
            config.run_tag(),
            sink,
            metrics,
            LoggerOptions {
                max_in_flight: endpoint.max_in_flight,
                queue_capacity: endpoint.queue_capacity,
            },
        ))
    }

    /// Start a dispatcher delivering to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        run_tag: impl Into<String>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<dyn MetricsSource>,
        options: LoggerOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());

        let dispatcher = tokio::spawn(dispatch_loop(
            rx,
            sink,
            metrics,
            options.max_in_flight.max(1),
            counters.clone(),
        ));

        Self {
            inner: Arc::new(Inner {
                run_tag: run_tag.into(),
                tx: Mutex::new(Some(tx)),
                dispatcher: Mutex::new(Some(dispatcher)),
                counters,
            }),
        }
    }

    pub fn run_tag(&self) -> &str {
        &self.inner.run_tag
    }

    /// Queue `kind` for delivery. Returns immediately; drops the event if the
    /// queue is full or the logger has been shut down.
    pub fn log(&self, server_id: &str, kind: EventKind, params: EventParams) {
        let event = Event {
            run_tag: self.inner.run_tag.clone(),
            server_id: server_id.to_string(),
            kind,
            params,
        };

        let guard = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let accepted = match guard.as_ref() {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(ev)) => {
                    debug!(event = %ev.kind, "event queue full, dropping event");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(ev)) => {
                    debug!(event = %ev.kind, "event dispatcher gone, dropping event");
                    false
                }
            },
            None => {
                debug!(event = %kind, "logger shut down, dropping event");
                false
            }
        };

        let counter = if accepted {
            &self.inner.counters.submitted
        } else {
            &self.inner.counters.dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LoggerStats {
        self.inner.counters.snapshot()
    }

    /// Stop accepting events and wait up to `timeout` for queued and in-flight
    /// deliveries. Whatever is left after that is abandoned.
    pub async fn shutdown(&self, timeout: Duration) -> LoggerStats {
        let tx = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(tx);

        let handle = self
            .inner
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(mut handle) = handle {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => debug!("event queue drained"),
                Ok(Err(e)) => warn!(error = %e, "event dispatcher ended abnormally"),
                Err(_) => {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "event queue not drained in time, abandoning remaining events"
                    );
                    handle.abort();
                }
            }
        }

        let stats = self.stats();
        info!(
            submitted = stats.submitted,
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            "event logger shut down"
        );
        stats
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<Event>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<dyn MetricsSource>,
    max_in_flight: usize,
    counters: Arc<Counters>,
) {
    let semaphore = Arc::new(Semaphore::new(max_in_flight));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        while in_flight.try_join_next().is_some() {}

        let sink = sink.clone();
        let metrics = metrics.clone();
        let counters = counters.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            deliver_one(event, sink.as_ref(), metrics, &counters).await;
        });
    }

    while in_flight.join_next().await.is_some() {}
}

async fn deliver_one(
    mut event: Event,
    sink: &dyn EventSink,
    metrics: Arc<dyn MetricsSource>,
    counters: &Counters,
) {
    let sampled = match tokio::task::spawn_blocking(move || metrics.collect()).await {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "metrics sampling failed, reporting zeros");
            SystemMetrics::default()
        }
    };
    event.params.extend_metrics(&sampled);

    match sink.deliver(&event).await {
        Ok(()) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(event = %event.kind, error = %e, "Failed to log event");
        }
    }
}
