use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_record_poll_interval_ms() -> u64 {
    2_000
}

fn default_history_poll_interval_ms() -> u64 {
    5_000
}

fn default_inbox_poll_interval_ms() -> u64 {
    3_000
}

fn default_thread_poll_interval_ms() -> u64 {
    3_000
}

fn default_roster_poll_interval_ms() -> u64 {
    10_000
}

fn default_malformed_threshold() -> u32 {
    crate::reconcile::DEFAULT_MALFORMED_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Client settings, read from `config.toml`. Every field is optional.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Single analysis record (result view).
    #[serde(default = "default_record_poll_interval_ms")]
    pub record_poll_interval_ms: u64,
    /// Analysis history (user dashboard).
    #[serde(default = "default_history_poll_interval_ms")]
    pub history_poll_interval_ms: u64,
    #[serde(default = "default_inbox_poll_interval_ms")]
    pub inbox_poll_interval_ms: u64,
    #[serde(default = "default_thread_poll_interval_ms")]
    pub thread_poll_interval_ms: u64,
    /// Doctor's patient roster.
    #[serde(default = "default_roster_poll_interval_ms")]
    pub roster_poll_interval_ms: u64,
    /// Consecutive malformed snapshots before an error is shown.
    #[serde(default = "default_malformed_threshold")]
    pub malformed_threshold: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            record_poll_interval_ms: default_record_poll_interval_ms(),
            history_poll_interval_ms: default_history_poll_interval_ms(),
            inbox_poll_interval_ms: default_inbox_poll_interval_ms(),
            thread_poll_interval_ms: default_thread_poll_interval_ms(),
            roster_poll_interval_ms: default_roster_poll_interval_ms(),
            malformed_threshold: default_malformed_threshold(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn record_poll_interval(&self) -> Duration {
        Duration::from_millis(self.record_poll_interval_ms)
    }

    pub fn history_poll_interval(&self) -> Duration {
        Duration::from_millis(self.history_poll_interval_ms)
    }

    pub fn inbox_poll_interval(&self) -> Duration {
        Duration::from_millis(self.inbox_poll_interval_ms)
    }

    pub fn thread_poll_interval(&self) -> Duration {
        Duration::from_millis(self.thread_poll_interval_ms)
    }

    pub fn roster_poll_interval(&self) -> Duration {
        Duration::from_millis(self.roster_poll_interval_ms)
    }
}
