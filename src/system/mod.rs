//! Host inspection helpers.

pub mod metrics;

pub use metrics::{MetricsSource, StaticMetrics, SysinfoMetrics, SystemMetrics};
