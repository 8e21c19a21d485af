//! Event names, parameters, and endpoint URL layout.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Url;

use crate::error::{BenchError, Result};
use crate::system::SystemMetrics;

/// Every event the harness emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CronStart,
    CronEnd,
    RunStart,
    RunEnd,
    NetworkCallStart,
    NetworkCallEnd,
    NetworkCallSymbolStart,
    NetworkCallSymbolEnd,
    FileIoStart,
    FileIoEnd,
    FileWriteStart,
    FileWriteEnd,
    FileReadStart,
    FileReadEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::CronStart,
        EventKind::CronEnd,
        EventKind::RunStart,
        EventKind::RunEnd,
        EventKind::NetworkCallStart,
        EventKind::NetworkCallEnd,
        EventKind::NetworkCallSymbolStart,
        EventKind::NetworkCallSymbolEnd,
        EventKind::FileIoStart,
        EventKind::FileIoEnd,
        EventKind::FileWriteStart,
        EventKind::FileWriteEnd,
        EventKind::FileReadStart,
        EventKind::FileReadEnd,
    ];

    /// Wire name, used as the last path segment.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::CronStart => "CRON_START",
            EventKind::CronEnd => "CRON_END",
            EventKind::RunStart => "RUN_START",
            EventKind::RunEnd => "RUN_END",
            EventKind::NetworkCallStart => "NETWORK_CALL_START",
            EventKind::NetworkCallEnd => "NETWORK_CALL_END",
            EventKind::NetworkCallSymbolStart => "NETWORK_CALL_SYMBOL_START",
            EventKind::NetworkCallSymbolEnd => "NETWORK_CALL_SYMBOL_END",
            EventKind::FileIoStart => "FILE_IO_START",
            EventKind::FileIoEnd => "FILE_IO_END",
            EventKind::FileWriteStart => "FILE_WRITE_START",
            EventKind::FileWriteEnd => "FILE_WRITE_END",
            EventKind::FileReadStart => "FILE_READ_START",
            EventKind::FileReadEnd => "FILE_READ_END",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unix time in fractional seconds.
pub fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Ordered query parameters of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventParams(Vec<(String, String)>);

impl EventParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters starting with a `timestamp` taken at `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self::new().with("timestamp", unix_seconds(at))
    }

    /// Parameters starting with a `timestamp` of right now.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl fmt::Display) {
        self.0.push((key.to_string(), value.to_string()));
    }

    /// Append `cpu_percent` and `memory_percent`.
    pub fn extend_metrics(&mut self, metrics: &SystemMetrics) {
        for (key, value) in metrics.as_params() {
            self.push(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

/// One telemetry record, as handed to a sink.
#[derive(Debug, Clone)]
pub struct Event {
    pub run_tag: String,
    pub server_id: String,
    pub kind: EventKind,
    pub params: EventParams,
}

impl Event {
    /// `{base}/{run_tag}/{server_id}/{event}?{params}`
    ///
    /// Each of the three trailing segments is percent-encoded on its own, so a
    /// `/` inside a server id cannot change the path shape.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| BenchError::InvalidEndpoint {
                url: base.to_string(),
            })?
            .pop_if_empty()
            .push(&self.run_tag)
            .push(&self.server_id)
            .push(self.kind.as_str());
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url)
    }
}
