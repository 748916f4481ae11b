//! Client configuration: credentials, hosts, timeout and token drift.

use std::time::Duration;

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.wall-box.com/";
pub const DEFAULT_AUTH_URL: &str = "https://user-api.wall-box.com/";

/// Settings for a `Wallbox` session.
///
/// `request_timeout` applies to authentication and to the read-only calls
/// (charger list, status, session history, schedules). `token_drift` is
/// subtracted from every token expiry before comparing it with the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub request_timeout: Option<Duration>,
    pub token_drift: Duration,
    pub base_url: String,
    pub auth_url: String,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            request_timeout: None,
            token_drift: Duration::ZERO,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_token_drift(mut self, drift: Duration) -> Self {
        self.token_drift = drift;
        self
    }

    /// Point both API and authentication calls at other hosts, e.g. a mock.
    pub fn with_hosts(mut self, base_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.auth_url = auth_url.into();
        self
    }

    /// Build a config from `WALLBOX_*` environment variables.
    ///
    /// `WALLBOX_USERNAME` and `WALLBOX_PASSWORD` are required. Optional:
    /// `WALLBOX_REQUEST_TIMEOUT_SECS`, `WALLBOX_TOKEN_DRIFT_SECS` (both
    /// non-negative, fractional seconds allowed), `WALLBOX_BASE_URL` and
    /// `WALLBOX_AUTH_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let username = lookup("WALLBOX_USERNAME")
            .ok_or_else(|| ApiError::Config("WALLBOX_USERNAME is not set".to_string()))?;
        let password = lookup("WALLBOX_PASSWORD")
            .ok_or_else(|| ApiError::Config("WALLBOX_PASSWORD is not set".to_string()))?;

        let mut config = Self::new(username, password);
        if let Some(raw) = lookup("WALLBOX_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Some(parse_seconds("WALLBOX_REQUEST_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("WALLBOX_TOKEN_DRIFT_SECS") {
            config.token_drift = parse_seconds("WALLBOX_TOKEN_DRIFT_SECS", &raw)?;
        }
        if let Some(url) = lookup("WALLBOX_BASE_URL") {
            config.base_url = url;
        }
        if let Some(url) = lookup("WALLBOX_AUTH_URL") {
            config.auth_url = url;
        }
        Ok(config)
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{key} is not a number: {raw:?}")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ApiError::Config(format!("{key} must be a non-negative number of seconds")))
}
