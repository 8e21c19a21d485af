//! Daily trigger for the benchmark runner.

pub mod cron;
pub mod engine;

pub use self::cron::DailySchedule;
pub use self::engine::{run_firing_loop, run_scheduler_loop};
