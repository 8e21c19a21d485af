//! One firing: CRON_START, N sequential runs, scratch cleanup, CRON_END.
//!
//! The network and file phases of a run are awaited strictly one after the
//! other so their timings never overlap. Only a failure to create the
//! scratch directory aborts a firing; everything else is logged and skipped.

pub mod report;
pub mod scratch;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, info_span, Instrument};

use crate::bench::{FileBenchmark, NetworkBenchmark, RunContext};
use crate::config::BenchConfig;
use crate::error::Result;
use crate::telemetry::{EventKind, EventLogger, EventParams};

pub use report::{FiringReport, FiringStatus, RunSummary};
pub use scratch::ScratchDir;

pub struct Orchestrator {
    config: Arc<BenchConfig>,
    logger: EventLogger,
    network: NetworkBenchmark,
    file: FileBenchmark,
}

impl Orchestrator {
    pub fn new(config: BenchConfig, logger: EventLogger) -> Result<Self> {
        let network = NetworkBenchmark::new(&config.price_api, logger.clone())?;
        let file = FileBenchmark::new(&config.file_io, logger.clone());
        Ok(Self {
            config: Arc::new(config),
            logger,
            network,
            file,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    /// Execute one firing. Never fails; the outcome is in the report.
    pub async fn execute(&self) -> FiringReport {
        let id = uuid::Uuid::new_v4();
        let span = info_span!("firing", %id, run_tag = %self.logger.run_tag());
        self.execute_inner(id).instrument(span).await
    }

    async fn execute_inner(&self, id: uuid::Uuid) -> FiringReport {
        let started_at = Utc::now();
        let server = &self.config.server;
        let run_tag = self.logger.run_tag().to_string();
        let total_runs = self.config.runs.count;

        self.logger.log(
            &server.id,
            EventKind::CronStart,
            EventParams::now()
                .with("ip", &server.ip)
                .with("run_tag", &run_tag),
        );

        let mut report = FiringReport {
            id,
            run_tag: run_tag.clone(),
            status: FiringStatus::Completed,
            scratch_dir: None,
            scratch_removed: false,
            runs: Vec::with_capacity(total_runs as usize),
            started_at,
            finished_at: started_at,
        };

        let scratch = match ScratchDir::create(&self.config.file_io.scratch_root, &server.id) {
            Ok(dir) => dir,
            Err(e) => {
                error!(error = %e, "Failed to create temp directory, aborting firing");
                report.status = FiringStatus::Aborted;
                self.finish(&mut report);
                return report;
            }
        };
        report.scratch_dir = Some(scratch.path().to_path_buf());

        let delay = Duration::from_secs(self.config.runs.delay_between_runs_secs);
        for run_number in 1..=total_runs {
            let ctx = RunContext {
                server_id: server.id.clone(),
                server_ip: server.ip.clone(),
                run_number,
                total_runs,
            };
            let summary = self.run_once(&ctx, &scratch).await;
            report.runs.push(summary);

            if !delay.is_zero() && !ctx.is_last() {
                info!(delay_secs = delay.as_secs(), "Waiting before next run");
                tokio::time::sleep(delay).await;
            }
        }

        report.scratch_removed = scratch.cleanup();
        self.finish(&mut report);
        report
    }

    async fn run_once(&self, ctx: &RunContext, scratch: &ScratchDir) -> RunSummary {
        info!(
            run_number = ctx.run_number,
            total_runs = ctx.total_runs,
            "Starting run {}/{}",
            ctx.run_number,
            ctx.total_runs
        );
        let start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::RunStart,
            EventParams::now()
                .with("ip", &ctx.server_ip)
                .with("run_number", ctx.run_number),
        );

        let network = self.network.measure(ctx).await;
        info!("Network I/O duration: {:.2} seconds", network.total_secs);

        let file = self.file.measure(scratch.path(), ctx).await;
        info!("File I/O duration: {:.2} seconds", file.total_secs);

        let total_secs = start.elapsed().as_secs_f64();
        self.logger.log(
            &ctx.server_id,
            EventKind::RunEnd,
            EventParams::now()
                .with("total_duration_seconds", total_secs)
                .with("network_io_duration_seconds", network.total_secs)
                .with("file_io_duration_seconds", file.total_secs)
                .with("ip", &ctx.server_ip)
                .with("run_number", ctx.run_number),
        );
        info!(
            run_number = ctx.run_number,
            server_id = %ctx.server_id,
            "Run completed in {:.2} seconds",
            total_secs
        );

        RunSummary {
            run_number: ctx.run_number,
            total_secs,
            network_secs: network.total_secs,
            file_secs: file.total_secs,
            symbols_failed: network.failed_count(),
            file_ok: file.succeeded(),
        }
    }

    fn finish(&self, report: &mut FiringReport) {
        let server = &self.config.server;
        self.logger.log(
            &server.id,
            EventKind::CronEnd,
            EventParams::now()
                .with("ip", &server.ip)
                .with("run_tag", &report.run_tag)
                .with("status", report.status.as_str()),
        );
        report.finished_at = Utc::now();
        info!(
            status = report.status.as_str(),
            runs = report.runs.len(),
            mean_run_secs = ?report.mean_total_secs(),
            "Firing finished"
        );
    }
}
