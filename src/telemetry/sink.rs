//! Destinations for dispatched events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Url};
use tracing::info;

use super::event::Event;
use crate::error::BenchError;

/// Trait for anything that accepts a finished event.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &Event) -> Result<()>;
}

/// `GET {base}/{run_tag}/{server_id}/{event}?...` against the remote log API.
pub struct HttpSink {
    client: Client,
    base_url: Url,
}

impl HttpSink {
    pub fn new(base_url: &str, timeout: Duration) -> crate::error::Result<Self> {
        let base_url = Url::parse(base_url).map_err(|_| BenchError::InvalidEndpoint {
            url: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BenchError::InvalidEndpoint {
                url: base_url.to_string(),
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

}

#[async_trait::async_trait]
impl EventSink for HttpSink {
    async fn deliver(&self, event: &Event) -> Result<()> {
        let url = event.url(&self.base_url)?;
        // Body is ignored; only a 2xx status counts as delivered.
        let status = self.client.get(url).send().await?.status();
        if !status.is_success() {
            anyhow::bail!("log endpoint answered {status}");
        }
        Ok(())
    }
}

/// Writes events to the local console when no endpoint is configured.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait::async_trait]
impl EventSink for ConsoleSink {
    async fn deliver(&self, event: &Event) -> Result<()> {
        info!(
            target: "iobench::event",
            run_tag = %event.run_tag,
            server_id = %event.server_id,
            event = %event.kind,
            params = %event.params,
            "event"
        );
        Ok(())
    }
}

/// Keeps every delivered event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl EventSink for MemorySink {
    async fn deliver(&self, event: &Event) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::event::{EventKind, EventParams};

    #[test]
    fn test_http_sink_rejects_bad_urls() {
        assert!(HttpSink::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpSink::new("data:text/plain,hi", Duration::from_secs(1)).is_err());
        assert!(HttpSink::new("https://logs.example.com/log", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_memory_sink_records() {
        let sink = MemorySink::new();
        let event = Event {
            run_tag: "t".to_string(),
            server_id: "1".to_string(),
            kind: EventKind::CronStart,
            params: EventParams::new(),
        };
        sink.deliver(&event).await.unwrap();
        ConsoleSink.deliver(&event).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::CronStart);
    }
}
