use crate::error::{Error, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://credocarbon-api-641001192587.asia-south2.run.app/api";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const ENV_API_URL: &str = "CREDOCARBON_API_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "CREDOCARBON_HTTP_TIMEOUT_SECS";

/// Connection settings shared by the session manager and the wizard.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

fn normalize_base_url(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return None;
    }
    Some(trimmed.to_string())
}

impl ClientConfig {
    /// Reads overrides from the environment, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                config = config.with_base_url(&url)?;
            }
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECONDS) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let seconds = raw
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("{ENV_TIMEOUT_SECONDS} must be an integer")))?;
                config = config.with_timeout(Duration::from_secs(seconds));
            }
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        self.base_url = normalize_base_url(url)
            .ok_or_else(|| Error::Config(format!("invalid base url: {url}")))?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        // reqwest treats a zero timeout as an immediate failure.
        self.timeout = timeout.max(Duration::from_secs(1));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
