//! Summary of one firing, for the console and for callers of `execute`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FiringStatus {
    /// Every run executed (individual phases may still have failed).
    Completed,
    /// The scratch directory could not be created; no run executed.
    Aborted,
}

impl FiringStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FiringStatus::Completed => "completed",
            FiringStatus::Aborted => "aborted",
        }
    }
}

/// Durations of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_number: u32,
    pub total_secs: f64,
    pub network_secs: f64,
    pub file_secs: f64,
    pub symbols_failed: usize,
    pub file_ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiringReport {
    pub id: uuid::Uuid,
    pub run_tag: String,
    pub status: FiringStatus,
    pub scratch_dir: Option<PathBuf>,
    pub scratch_removed: bool,
    pub runs: Vec<RunSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FiringReport {
    pub fn mean_total_secs(&self) -> Option<f64> {
        if self.runs.is_empty() {
            return None;
        }
        Some(self.runs.iter().map(|r| r.total_secs).sum::<f64>() / self.runs.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(n: u32, total: f64) -> RunSummary {
        RunSummary {
            run_number: n,
            total_secs: total,
            network_secs: total / 2.0,
            file_secs: total / 2.0,
            symbols_failed: 0,
            file_ok: true,
        }
    }

    #[test]
    fn test_mean_total() {
        let mut report = FiringReport {
            id: uuid::Uuid::new_v4(),
            run_tag: "15:22-2".to_string(),
            status: FiringStatus::Completed,
            scratch_dir: None,
            scratch_removed: true,
            runs: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert_eq!(report.mean_total_secs(), None);

        report.runs = vec![run(1, 1.0), run(2, 3.0)];
        assert_eq!(report.mean_total_secs(), Some(2.0));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&FiringStatus::Aborted).unwrap();
        assert_eq!(json, "\"aborted\"");
        assert_eq!(FiringStatus::Completed.as_str(), "completed");
    }
}
