use std::time::Duration;

use crate::core::constants::{
    BACKEND_URL_ENV, CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    REQUEST_TIMEOUT_ENV,
};
use crate::error::{Result, SafelizaSdkError};

/// Connection settings for the session backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, without trailing slash
    pub backend_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        let backend_url: String = backend_url.into();
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Load from the process environment, after reading `.env` if present.
    ///
    /// `SAFELIZA_BACKEND_URL` is required; the timeouts are optional
    /// millisecond values.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(BACKEND_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SafelizaSdkError::Config(format!("{} is not set", BACKEND_URL_ENV)))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SafelizaSdkError::Config(format!(
                "{} must be an http(s) URL, got {:?}",
                BACKEND_URL_ENV, url
            )));
        }

        let millis = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                None => Ok(Duration::from_millis(default)),
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| {
                    SafelizaSdkError::Config(format!("{} must be milliseconds, got {:?}", key, raw))
                }),
            }
        };

        Ok(Self::new(url)
            .with_request_timeout(millis(REQUEST_TIMEOUT_ENV, DEFAULT_REQUEST_TIMEOUT_MS)?)
            .with_connect_timeout(millis(CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_MS)?))
    }

    /// Absolute URL for a backend route.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }
}
