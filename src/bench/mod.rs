//! The two timed benchmark phases.

pub mod file;
pub mod network;

pub use file::{FileBenchmark, FileIoResult};
pub use network::{NetworkBenchmark, NetworkResult, PriceTicker, SymbolResult};

/// Identity of the run a phase belongs to.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub server_id: String,
    /// Annotation only.
    pub server_ip: String,
    /// 1-based.
    pub run_number: u32,
    pub total_runs: u32,
}

impl RunContext {
    pub fn is_last(&self) -> bool {
        self.run_number >= self.total_runs
    }
}
