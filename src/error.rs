//! Error types shared across the benchmark harness.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("failed to create scratch directory {path}: {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schedule time '{value}': expected HH:MM")]
    InvalidScheduleTime { value: String },

    #[error("invalid UTC offset '{value}': expected +HH:MM or -HH:MM")]
    InvalidUtcOffset { value: String },

    #[error("invalid log endpoint URL '{url}'")]
    InvalidEndpoint { url: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
