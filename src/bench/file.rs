//! Write-then-read file benchmark.
//!
//! The file is left behind on purpose; the runner removes the whole scratch
//! directory once every run is done.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::error;

use super::RunContext;
use crate::config::FileIoConfig;
use crate::telemetry::{EventKind, EventLogger, EventParams};

/// Name of the scratch file for `run_number`.
pub fn file_name(run_number: u32) -> String {
    format!("io_test_file_{}.tmp", run_number)
}

/// Timings and byte counts of one write/read cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileIoResult {
    pub total_secs: f64,
    pub write_secs: Option<f64>,
    pub read_secs: Option<f64>,
    pub bytes_written: usize,
    pub bytes_read: usize,
    pub error: Option<String>,
}

impl FileIoResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct FileBenchmark {
    payload: Arc<[u8]>,
    logger: EventLogger,
}

impl FileBenchmark {
    pub fn new(config: &FileIoConfig, logger: EventLogger) -> Self {
        let payload = config.payload_text.repeat(config.payload_repeat);
        Self {
            payload: Arc::from(payload.into_bytes()),
            logger,
        }
    }

    /// Run one cycle in `dir` and return its elapsed seconds.
    pub async fn run(&self, dir: &Path, ctx: &RunContext) -> f64 {
        self.measure(dir, ctx).await.total_secs
    }

    /// Run one cycle in `dir`, keeping sub-phase detail.
    ///
    /// I/O errors stop the cycle but are not returned; `total_secs` then covers
    /// everything up to the failure.
    pub async fn measure(&self, dir: &Path, ctx: &RunContext) -> FileIoResult {
        let start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::FileIoStart,
            EventParams::now().with("run_number", ctx.run_number),
        );

        let path = dir.join(file_name(ctx.run_number));
        let mut result = FileIoResult::default();
        if let Err(e) = self.write_then_read(&path, ctx, &mut result).await {
            error!(path = %path.display(), error = %e, "File I/O operation failed");
            result.error = Some(e.to_string());
        }

        result.total_secs = start.elapsed().as_secs_f64();
        self.logger.log(
            &ctx.server_id,
            EventKind::FileIoEnd,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("total_duration", result.total_secs),
        );
        result
    }

    async fn write_then_read(
        &self,
        path: &Path,
        ctx: &RunContext,
        result: &mut FileIoResult,
    ) -> std::io::Result<()> {
        let filename = path.display().to_string();

        let write_start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::FileWriteStart,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("filename", &filename),
        );
        tokio::fs::write(path, &self.payload[..]).await?;
        let write_secs = write_start.elapsed().as_secs_f64();
        result.write_secs = Some(write_secs);
        result.bytes_written = self.payload.len();
        self.logger.log(
            &ctx.server_id,
            EventKind::FileWriteEnd,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("filename", &filename)
                .with("duration", write_secs),
        );

        let read_start = Instant::now();
        self.logger.log(
            &ctx.server_id,
            EventKind::FileReadStart,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("filename", &filename),
        );
        // Contents are discarded; only the length is kept.
        let contents = tokio::fs::read(path).await?;
        let read_secs = read_start.elapsed().as_secs_f64();
        result.read_secs = Some(read_secs);
        result.bytes_read = contents.len();
        drop(contents);
        self.logger.log(
            &ctx.server_id,
            EventKind::FileReadEnd,
            EventParams::now()
                .with("run_number", ctx.run_number)
                .with("filename", &filename)
                .with("duration", read_secs),
        );

        Ok(())
    }
}
