//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for the worker loop, external tools, re-indexing, and job
//! retention. Every section defaults sensibly so an empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub worker: WorkerConfig,
    pub tools: ToolsConfig,
    pub rescan: RescanConfig,
    pub retention: RetentionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.worker.poll_interval_secs == 0 {
            warnings.push("worker.poll_interval_secs is 0; the worker will busy-poll".into());
        }

        if self.worker.max_retries == 0 {
            warnings.push(
                "worker.max_retries is 0; every claimed job will fail immediately".into(),
            );
        }

        if let Some(ref cmd) = self.rescan.command {
            if cmd.trim().is_empty() {
                warnings.push("rescan.command is set but empty".into());
            }
        }

        if self.retention.max_age_days == 0 {
            warnings.push(
                "retention.max_age_days is 0; cleanup will delete all finished jobs".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Worker loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Path to the SQLite job store.
    pub db_path: PathBuf,
    /// Seconds to sleep when no pending job is found.
    pub poll_interval_secs: u64,
    /// Jobs whose retry count has reached this ceiling are failed without
    /// another execution attempt.
    pub max_retries: u32,
    /// Milliseconds to pause between work cycles.
    pub cycle_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/reelforge.db"),
            poll_interval_secs: 5,
            max_retries: 3,
            cycle_delay_ms: 500,
        }
    }
}

/// Paths to external CLI tools. `None` means search `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Post-conversion re-index hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RescanConfig {
    /// Shell command spawned after a successful conversion so the hosting
    /// platform picks up the new output folder. Disabled when `None`.
    pub command: Option<String>,
}

/// Age-based cleanup of finished jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Completed/failed jobs older than this many days are eligible for
    /// deletion by the cleanup command.
    pub max_age_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { max_age_days: 7 }
    }
}
