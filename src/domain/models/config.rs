use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Hypercycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cycle timing
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Outbound call pacing
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Reasoning provider connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// History and criteria files
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing of the continuous cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CycleConfig {
    /// Nominal cycle length before overtime
    #[serde(default = "default_base_duration_ms")]
    pub base_duration_ms: u64,

    /// Ceiling on accumulated overtime
    #[serde(default = "default_max_overtime_ms")]
    pub max_overtime_ms: u64,

    /// Pause between rounds in continuous mode
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Deadline check cadence
    #[serde(default = "default_deadline_poll_ms")]
    pub deadline_poll_ms: u64,
}

const fn default_base_duration_ms() -> u64 {
    60_000
}

const fn default_max_overtime_ms() -> u64 {
    60_000
}

const fn default_tick_interval_ms() -> u64 {
    3_000
}

const fn default_deadline_poll_ms() -> u64 {
    1_000
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: default_base_duration_ms(),
            max_overtime_ms: default_max_overtime_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            deadline_poll_ms: default_deadline_poll_ms(),
        }
    }
}

impl CycleConfig {
    /// Pause between continuous rounds.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// How often the deadline watcher runs.
    pub const fn deadline_poll(&self) -> Duration {
        Duration::from_millis(self.deadline_poll_ms)
    }
}

/// Concurrency and spacing of provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Provider calls allowed in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Minimum gap between two consecutive starts
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

const fn default_max_concurrent() -> usize {
    1
}

const fn default_min_spacing_ms() -> u64 {
    3_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl DispatcherConfig {
    /// Minimum gap between two starts.
    pub const fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

/// OpenRouter-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// API root, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `OPENROUTER_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature when a request sets none.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "anthropic/claude-3-haiku-20240307".to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_temperature() -> f32 {
    0.8
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Where history, criteria and halts are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// History file.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Fail-safe criteria file.
    #[serde(default = "default_criteria_path")]
    pub criteria_path: PathBuf,

    /// Outstanding fail-safe halt, present until acknowledged.
    #[serde(default = "default_halt_path")]
    pub halt_path: PathBuf,
}

fn default_history_path() -> PathBuf {
    PathBuf::from(".hypercycle/history.json")
}

fn default_criteria_path() -> PathBuf {
    PathBuf::from(".hypercycle/fail_safe_criteria.json")
}

fn default_halt_path() -> PathBuf {
    PathBuf::from(".hypercycle/halt.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            criteria_path: default_criteria_path(),
            halt_path: default_halt_path(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON, one event per line
    Json,
    /// Human-readable multi-line output
    #[default]
    Pretty,
}

/// Rotation of the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// Single file.
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of files under `log_dir`.
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
