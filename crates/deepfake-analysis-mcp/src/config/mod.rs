//! Configuration loading and resolution.

use std::time::Duration;

use deepfake_analysis::ClientConfig;

/// Values supplied on the command line; each one beats its env var.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Resolve the client configuration: explicit flag > environment > default.
pub fn resolve_client_config(overrides: ConfigOverrides) -> ClientConfig {
    let mut config = ClientConfig::from_env();

    if let Some(url) = overrides.api_url.filter(|u| !u.trim().is_empty()) {
        config.base_url = url;
    }
    if let Some(key) = overrides.api_key.filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key);
    }
    if let Some(ms) = overrides.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(attempts) = overrides.max_poll_attempts {
        config.max_poll_attempts = attempts;
    }
    if let Some(secs) = overrides.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    if config.api_key.is_none() {
        tracing::warn!("No API key configured; requests to {} are unauthenticated", config.base_url);
    }

    config
}
