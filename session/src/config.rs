//! Session configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ceremony_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Configuration for a validation session.
///
/// Can be loaded from a TOML file via [`SessionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Node JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// HTTP client timeout for every node call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// `dna_epoch` polling cadence.
    #[serde(default = "default_epoch_poll_ms")]
    pub epoch_poll_ms: u64,

    /// `dna_ceremonyIntervals` polling cadence.
    #[serde(default = "default_timing_poll_ms")]
    pub timing_poll_ms: u64,

    /// Flip fetch cadence while the flip list is not ready.
    #[serde(default = "default_fetch_interval_ms")]
    pub fetch_interval_ms: u64,

    /// Delay from the start of a phase before reserve flips are revealed.
    #[serde(default = "default_extra_flips_delay_secs")]
    pub extra_flips_delay_secs: u64,

    /// Countdown tick.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Where submitted answers are kept. In memory when unset.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "http://127.0.0.1:9009".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_epoch_poll_ms() -> u64 {
    1_000
}

fn default_timing_poll_ms() -> u64 {
    60_000
}

fn default_fetch_interval_ms() -> u64 {
    1_000
}

fn default_extra_flips_delay_secs() -> u64 {
    35
}

fn default_tick_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SessionError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, SessionError> {
        toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn epoch_poll(&self) -> Duration {
        Duration::from_millis(self.epoch_poll_ms)
    }

    pub fn timing_poll(&self) -> Duration {
        Duration::from_millis(self.timing_poll_ms)
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn extra_flips_delay(&self) -> Duration {
        Duration::from_secs(self.extra_flips_delay_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            request_timeout_secs: default_request_timeout_secs(),
            epoch_poll_ms: default_epoch_poll_ms(),
            timing_poll_ms: default_timing_poll_ms(),
            fetch_interval_ms: default_fetch_interval_ms(),
            extra_flips_delay_secs: default_extra_flips_delay_secs(),
            tick_ms: default_tick_ms(),
            state_file: None,
            log_format: LogFormat::Human,
            log_level: default_log_level(),
        }
    }
}
