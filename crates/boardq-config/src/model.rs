// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level boardq configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoardqConfig {
    /// Command processor behavior.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Sequential executor behavior.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Queue gateway read and retention settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Command store backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// External interpreter service.
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

/// Command processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Pause after the claim write before calling the interpreter, letting the
    /// `processing` status reach other subscribers first.
    #[serde(default = "default_claim_delay_ms")]
    pub claim_delay_ms: u64,

    /// Fail a command whose interpreter call takes longer than this.
    /// Unset means wait indefinitely.
    #[serde(default)]
    pub interpreter_timeout_secs: Option<u64>,

    /// Wait before retrying after a claim write errors. Doubles on each
    /// consecutive error, up to 30 times this value.
    #[serde(default = "default_claim_retry_ms")]
    pub claim_retry_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            claim_delay_ms: default_claim_delay_ms(),
            interpreter_timeout_secs: None,
            claim_retry_ms: default_claim_retry_ms(),
        }
    }
}

impl ProcessorConfig {
    pub fn claim_delay(&self) -> Duration {
        Duration::from_millis(self.claim_delay_ms)
    }

    pub fn interpreter_timeout(&self) -> Option<Duration> {
        self.interpreter_timeout_secs.map(Duration::from_secs)
    }

    pub fn claim_retry(&self) -> Duration {
        Duration::from_millis(self.claim_retry_ms)
    }
}

fn default_claim_delay_ms() -> u64 {
    100
}

fn default_claim_retry_ms() -> u64 {
    1000
}

/// Sequential executor configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Skip the remaining steps after the first failing one.
    #[serde(default)]
    pub stop_on_error: bool,

    /// Fixed pause between consecutive steps.
    #[serde(default)]
    pub delay_between_steps_ms: u64,

    /// Fail a single board mutation that takes longer than this.
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
}

impl ExecutorConfig {
    pub fn delay_between_steps(&self) -> Duration {
        Duration::from_millis(self.delay_between_steps_ms)
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

/// Queue gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Default cap for history listings (most recent first).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Age after which terminal commands are garbage collected by `cleanup`.
    #[serde(default = "default_cleanup_ttl_secs")]
    pub cleanup_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            cleanup_ttl_secs: default_cleanup_ttl_secs(),
        }
    }
}

impl QueueConfig {
    pub fn cleanup_ttl(&self) -> Duration {
        Duration::from_secs(self.cleanup_ttl_secs)
    }
}

fn default_history_limit() -> usize {
    50
}

fn default_cleanup_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// Which command store implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store; commands vanish on exit.
    Memory,
    /// SQLite file shared by every process on the host.
    #[default]
    Sqlite,
}

/// Command store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How often the SQLite store checks for commits made by other processes.
    #[serde(default = "default_change_poll_ms")]
    pub change_poll_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            change_poll_ms: default_change_poll_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("boardq").join("boardq.db"))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "boardq.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_change_poll_ms() -> u64 {
    250
}

/// External interpreter service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InterpreterConfig {
    /// URL the interpreter client posts commands to. `None` disables it.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Transport-level timeout for one HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Level for boardq crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
