//! Environment-driven configuration for the API client and session engine.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 400;
const DEFAULT_AUTO_ADVANCE_DELAY_MS: u64 = 250;

/// Connection settings for the mock-test API.
///
/// Custom `Debug` masks the token so it never lands in logs.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Reads `MOCKTEST_API_URL`, `MOCKTEST_API_TOKEN` and `MOCKTEST_API_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("MOCKTEST_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = env::var("MOCKTEST_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Self {
            base_url,
            token: None,
            timeout,
        }
        .with_token(env::var("MOCKTEST_API_TOKEN").ok())
    }
}

/// Tunables for a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period before a burst of edits is pushed to the server.
    pub autosave_debounce: Duration,
    /// Delay between selecting an answer and auto-advancing.
    pub auto_advance_delay: Duration,
    /// Initial auto-advance setting for fresh sessions.
    pub auto_advance: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            auto_advance_delay: Duration::from_millis(DEFAULT_AUTO_ADVANCE_DELAY_MS),
            auto_advance: true,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `MOCKTEST_AUTOSAVE_DEBOUNCE_MS`,
    /// `MOCKTEST_AUTO_ADVANCE_DELAY_MS` and `MOCKTEST_AUTO_ADVANCE`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("MOCKTEST_AUTOSAVE_DEBOUNCE_MS") {
            config.autosave_debounce = ms;
        }
        if let Some(ms) = env_millis("MOCKTEST_AUTO_ADVANCE_DELAY_MS") {
            config.auto_advance_delay = ms;
        }
        if let Some(flag) = env::var("MOCKTEST_AUTO_ADVANCE")
            .ok()
            .and_then(|v| parse_flag(&v))
        {
            config.auto_advance = flag;
        }
        config
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_masks_token() {
        let config = ApiConfig::new("http://x").with_token(Some("secret".into()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ApiConfig::new("http://x").with_token(Some("  ".into()));
        assert!(config.token.is_none());
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.autosave_debounce, Duration::from_millis(400));
        assert!(config.auto_advance);
    }
}
