//! TOML configuration for the benchmark harness.
//!
//! A single immutable [`BenchConfig`] is built once at startup (file, then
//! environment, then CLI positionals) and handed to the runner by value.
//! Nothing here is mutated after the scheduler starts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "IOBENCH_CONFIG";

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "iobench.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the benchmark process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runs: RunsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub log_endpoint: LogEndpointConfig,
    #[serde(default)]
    pub price_api: PriceApiConfig,
    #[serde(default)]
    pub file_io: FileIoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded benchmark configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. `explicit` (the `--config` flag).
    /// 2. The path in the `IOBENCH_CONFIG` environment variable.
    /// 3. `./iobench.toml`.
    /// 4. Compiled-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(env_path));
        }
        candidates.push(PathBuf::from(DEFAULT_CONFIG_FILE));

        for path in candidates {
            if !path.exists() {
                debug!(path = %path.display(), "config candidate not found");
                continue;
            }
            match Self::load(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "config file could not be loaded, trying fallback"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Apply `IOBENCH_SERVER_ID`, `IOBENCH_SERVER_IP` and `IOBENCH_LOG_BASE_URL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("IOBENCH_SERVER_ID").filter(|v| !v.trim().is_empty()) {
            self.server.id = id;
        }
        if let Some(ip) = lookup("IOBENCH_SERVER_IP").filter(|v| !v.trim().is_empty()) {
            self.server.ip = ip;
        }
        if let Some(url) = lookup("IOBENCH_LOG_BASE_URL") {
            self.log_endpoint.base_url = url;
        }
    }

    /// Apply the optional `[num_runs] [server_id]` positionals.
    ///
    /// Bad values keep whatever was configured and print a warning.
    pub fn apply_cli_overrides(&mut self, num_runs: Option<&str>, server_id: Option<&str>) {
        if let Some(raw) = num_runs {
            match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => {
                    self.runs.count = n;
                    info!(num_runs = n, "number of runs set via command-line argument");
                }
                _ => warn!(
                    value = %raw,
                    default = self.runs.count,
                    "invalid number of runs specified, using default"
                ),
            }
        }
        if let Some(raw) = server_id {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!(default = %self.server.id, "empty server ID specified, using default");
            } else {
                self.server.id = trimmed.to_string();
                info!(server_id = %self.server.id, "server ID set via command-line argument");
            }
        }
    }

    /// Tag namespacing every event of this deployment: `"{HH:MM}-{runs}"`.
    pub fn run_tag(&self) -> String {
        format!("{}-{}", self.schedule.time, self.runs.count)
    }

    /// `None` when remote event logging is disabled.
    pub fn log_base_url(&self) -> Option<&str> {
        let url = self.log_endpoint.base_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

// ---------------------------------------------------------------------------
// Server identity
// ---------------------------------------------------------------------------

/// Identity of this server in the emitted telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub id: String,
    /// Annotation only, never bound to.
    pub ip: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            id: "1".to_string(),
            ip: "192.0.2.1".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunsConfig {
    /// Runs per firing.
    pub count: u32,
    /// Pause between consecutive runs. Zero disables it.
    pub delay_between_runs_secs: u64,
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            count: 20,
            delay_between_runs_secs: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Daily trigger time in a fixed timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// 24-hour `HH:MM`.
    pub time: String,
    /// Fixed offset from UTC, `+HH:MM` / `-HH:MM`. Defaults to PKT.
    pub utc_offset: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: "15:22".to_string(),
            utc_offset: "+05:00".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote log endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEndpointConfig {
    /// Base URL; events go to `{base_url}/{run_tag}/{server_id}/{event}`.
    /// Empty string logs events to the console only.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound on concurrent in-flight dispatches.
    pub max_in_flight: usize,
    /// Events buffered before new submissions are dropped.
    pub queue_capacity: usize,
    /// How long shutdown waits for queued events.
    pub drain_timeout_secs: u64,
    /// Attach `cpu_percent` / `memory_percent` to every event.
    pub collect_metrics: bool,
    /// CPU sampling window.
    pub metrics_sample_ms: u64,
}

impl Default for LogEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openlogs.hassankhurram.com/log".to_string(),
            timeout_secs: 30,
            max_in_flight: 50,
            queue_capacity: 1024,
            drain_timeout_secs: 5,
            collect_metrics: true,
            metrics_sample_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// Price API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceApiConfig {
    /// Ticker endpoint queried as `{base_url}?symbol={SYMBOL}`.
    pub base_url: String,
    /// Fetched in order, one request each.
    pub symbols: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com/api/v3/ticker/price".to_string(),
            symbols: ["BTCUSDT", "ETHUSDT", "BNBUSDT", "XRPUSDT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIoConfig {
    /// Parent of the per-firing scratch directory.
    pub scratch_root: PathBuf,
    pub payload_text: String,
    /// `payload_text` repetitions; the default yields roughly 2.1 MB.
    pub payload_repeat: usize,
}

impl Default for FileIoConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from("."),
            payload_text: "This is a test.".to_string(),
            payload_repeat: 140_000,
        }
    }
}

impl FileIoConfig {
    pub fn payload_len(&self) -> usize {
        self.payload_text.len() * self.payload_repeat
    }
}

// ---------------------------------------------------------------------------
// Local logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    /// `text` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
