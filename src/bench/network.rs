//! Price-ticker fetch benchmark.
//!
//! Symbols are fetched one after another. A failed symbol is logged and
//! skipped; the batch always runs to the end and reports its true elapsed
//! time.

use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::RunContext;
use crate::config::PriceApiConfig;
use crate::telemetry::{EventKind, EventLogger, EventParams};

/// Body of `GET {base}?symbol=...`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceTicker {
    pub symbol: String,
    pub price: String,
}

/// Outcome of one symbol fetch.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub duration_secs: f64,
    pub price: Option<String>,
    pub error: Option<String>,
}

impl SymbolResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of the whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkResult {
    pub total_secs: f64,
    pub symbols: Vec<SymbolResult>,
}

impl NetworkResult {
    pub fn failed_count(&self) -> usize {
        self.symbols.iter().filter(|s| !s.succeeded()).count()
    }
}

pub struct NetworkBenchmark {
    client: Client,
    base_url: String,
    symbols: Vec<String>,
    logger: EventLogger,
}

impl NetworkBenchmark {
    pub fn new(config: &PriceApiConfig, logger: EventLogger) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            symbols: config.symbols.clone(),
            logger,
        })
    }

    /// Latest price for one symbol. Non-2xx and undecodable bodies are errors.
    pub async fn fetch_price(&self, symbol: &str) -> Result<PriceTicker> {
        let ticker = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json::<PriceTicker>()
            .await?;
        Ok(ticker)
    }

    /// Run the batch and return its elapsed seconds.
    pub async fn run(&self, ctx: &RunContext) -> f64 {
        self.measure(ctx).await.total_secs
    }

    /// Run the batch, keeping per-symbol detail.
    pub async fn measure(&self, ctx: &RunContext) -> NetworkResult {
        let batch_start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::NetworkCallStart,
            EventParams::now().with("run_number", ctx.run_number),
        );

        let mut symbols = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            symbols.push(self.measure_symbol(ctx, symbol).await);
        }

        let total_secs = batch_start.elapsed().as_secs_f64();
        self.logger.log(
            &ctx.server_id,
            EventKind::NetworkCallEnd,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("total_duration", total_secs),
        );

        NetworkResult { total_secs, symbols }
    }

    async fn measure_symbol(&self, ctx: &RunContext, symbol: &str) -> SymbolResult {
        let start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::NetworkCallSymbolStart,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("symbol", symbol),
        );

        let (price, error) = match self.fetch_price(symbol).await {
            Ok(ticker) => {
                info!(symbol = %ticker.symbol, price = %ticker.price, "Fetched price");
                (Some(ticker.price), None)
            }
            Err(e) => {
                warn!(%symbol, error = %e, "Failed to fetch data for symbol");
                (None, Some(e.to_string()))
            }
        };

        let duration_secs = start.elapsed().as_secs_f64();
        self.logger.log(
            &ctx.server_id,
            EventKind::NetworkCallSymbolEnd,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("symbol", symbol)
                .with("duration", duration_secs),
        );

        SymbolResult {
            symbol: symbol.to_string(),
            duration_secs,
            price,
            error,
        }
    }
}
