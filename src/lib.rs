//! iobench -- scheduled network and file I/O latency benchmark.
//!
//! Once a day the runner fetches a handful of ticker prices and writes/reads
//! a ~2 MB scratch file, timing each phase, and reports every phase boundary
//! as a telemetry event to a remote log endpoint so several servers can be
//! compared side by side.

pub mod bench;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod system;
pub mod telemetry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::BenchConfig;
use crate::runner::{FiringReport, Orchestrator};
use crate::scheduler::DailySchedule;
use crate::telemetry::EventLogger;

fn build(config: BenchConfig) -> Result<(Arc<Orchestrator>, Duration)> {
    let drain = Duration::from_secs(config.log_endpoint.drain_timeout_secs);
    let logger = EventLogger::from_config(&config)?;
    let orchestrator = Orchestrator::new(config, logger)?;
    Ok((Arc::new(orchestrator), drain))
}

/// Start the daemon: fire once a day until `shutdown` resolves, then drain
/// pending log events.
pub async fn serve<F>(config: BenchConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    // 1. Validate the trigger before anything starts.
    let schedule = DailySchedule::from_config(&config.schedule)?;

    // 2. Logger pool + runner
    let (orchestrator, drain) = build(config)?;
    let cfg = orchestrator.config();
    tracing::info!(
        server_id = %cfg.server.id,
        run_tag = %orchestrator.logger().run_tag(),
        runs = cfg.runs.count,
        "Benchmark configured"
    );

    // 3. Block on the scheduler loop
    scheduler::run_scheduler_loop(schedule, orchestrator.clone(), shutdown).await;

    orchestrator.logger().shutdown(drain).await;
    Ok(())
}

/// Execute a single firing right now and drain its log events.
pub async fn run_once(config: BenchConfig) -> Result<FiringReport> {
    let (orchestrator, drain) = build(config)?;
    let report = orchestrator.execute().await;
    orchestrator.logger().shutdown(drain).await;
    Ok(report)
}
