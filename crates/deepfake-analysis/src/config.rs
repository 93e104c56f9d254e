//! Immutable client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_BASE_URL: &str = "DEEPFAKE_API_URL";
pub const ENV_API_KEY: &str = "DEEPFAKE_API_KEY";
pub const ENV_POLL_INTERVAL_MS: &str = "DEEPFAKE_POLL_INTERVAL_MS";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "DEEPFAKE_MAX_POLL_ATTEMPTS";
pub const ENV_TIMEOUT_SECS: &str = "DEEPFAKE_TIMEOUT_SECS";

/// Configuration for the session client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote analysis service
    pub base_url: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    /// Wait between status queries
    pub poll_interval: Duration,
    /// Status re-queries allowed before giving up
    pub max_poll_attempts: u32,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var(ENV_BASE_URL).unwrap_or(defaults.base_url),
            api_key: std::env::var(ENV_API_KEY)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            poll_interval: env_parse(ENV_POLL_INTERVAL_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_poll_attempts: env_parse(ENV_MAX_POLL_ATTEMPTS)
                .unwrap_or(defaults.max_poll_attempts),
            request_timeout: env_parse(ENV_TIMEOUT_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Join a path onto the base URL with exactly one slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
