//! CPU and memory utilisation attached to every emitted event.
//!
//! Collection never fails: on platforms `sysinfo` does not support, or when
//! the host reports no memory, the affected field reads `0.0`.

use std::time::Duration;

use serde::Serialize;
use sysinfo::System;

/// Point-in-time utilisation, both in percent (0-100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl SystemMetrics {
    /// Query-parameter form, in the order they are appended to an event.
    pub fn as_params(&self) -> [(&'static str, String); 2] {
        [
            ("cpu_percent", format!("{:.1}", self.cpu_percent)),
            ("memory_percent", format!("{:.1}", self.memory_percent)),
        ]
    }
}

/// Anything that can report current utilisation.
///
/// Implementations may block (CPU sampling does), so callers on an async
/// runtime should go through `spawn_blocking`.
pub trait MetricsSource: Send + Sync {
    fn collect(&self) -> SystemMetrics;
}

/// Live readings from the OS via `sysinfo`.
#[derive(Debug, Clone)]
pub struct SysinfoMetrics {
    sample_interval: Duration,
}

impl SysinfoMetrics {
    pub fn new(sample_interval: Duration) -> Self {
        // sysinfo needs two refreshes at least this far apart for a real CPU figure.
        Self {
            sample_interval: sample_interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl MetricsSource for SysinfoMetrics {
    fn collect(&self) -> SystemMetrics {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return SystemMetrics::default();
        }

        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(self.sample_interval);
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_percent = f64::from(sys.global_cpu_usage());
        let total = sys.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            sys.used_memory() as f64 / total as f64 * 100.0
        };

        SystemMetrics {
            cpu_percent: sanitize(cpu_percent),
            memory_percent: sanitize(memory_percent),
        }
    }
}

/// Fixed readings, for hosts where metrics collection is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMetrics(pub SystemMetrics);

impl MetricsSource for StaticMetrics {
    fn collect(&self) -> SystemMetrics {
        self.0
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
