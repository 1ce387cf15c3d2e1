use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{config_invalid, ClientResult};

// Environment keys
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const API_BASE_PATH_ENV: &str = "API_BASE_PATH";
pub const API_REFRESH_TIMEOUT_ENV: &str = "API_REFRESH_TIMEOUT_SECS";
pub const API_REQUEST_TIMEOUT_ENV: &str = "API_REQUEST_TIMEOUT_SECS";

// Default configuration values
const DEFAULT_BASE_PATH: &str = "/api/v1";
const DEFAULT_REFRESH_ENDPOINT: &str = "/auth/refresh-token";
const DEFAULT_LOGIN_ENDPOINT: &str = "/auth/login";
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_REFRESH_TIMEOUT_SECONDS: u64 = 30;

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, e.g. `https://api.example.edu`. Without it the API
    /// prefix alone forms a relative URL (dev proxy setups).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path prefix every endpoint lives under
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Endpoint that exchanges a refresh token for a new session
    #[serde(default = "default_refresh_endpoint")]
    pub refresh_endpoint: String,
    /// Endpoint that exchanges credentials for a session
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,
    /// Application route users are sent to when the session is lost
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Upper bound on a single refresh call, in seconds
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_seconds: u64,
    /// Optional per-request timeout applied by the transport, in seconds
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

fn default_refresh_endpoint() -> String {
    DEFAULT_REFRESH_ENDPOINT.to_string()
}

fn default_login_endpoint() -> String {
    DEFAULT_LOGIN_ENDPOINT.to_string()
}

fn default_login_route() -> String {
    DEFAULT_LOGIN_ROUTE.to_string()
}

fn default_refresh_timeout() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECONDS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_path: default_base_path(),
            refresh_endpoint: default_refresh_endpoint(),
            login_endpoint: default_login_endpoint(),
            login_route: default_login_route(),
            refresh_timeout_seconds: default_refresh_timeout(),
            request_timeout_seconds: None,
        }
    }
}

impl ApiConfig {
    /// Config pointing at a specific backend origin, everything else default
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(API_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = Some(base_url.trim_end_matches('/').to_string());
        }

        if let Some(base_path) = lookup(API_BASE_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_path = base_path;
        }

        if let Some(raw) = lookup(API_REFRESH_TIMEOUT_ENV) {
            config.refresh_timeout_seconds = parse_seconds(API_REFRESH_TIMEOUT_ENV, &raw)?;
        }

        if let Some(raw) = lookup(API_REQUEST_TIMEOUT_ENV) {
            config.request_timeout_seconds = Some(parse_seconds(API_REQUEST_TIMEOUT_ENV, &raw)?);
        }

        debug!(
            base_url = ?config.base_url,
            base_path = %config.base_path,
            "Loaded API configuration"
        );

        Ok(config)
    }

    /// Base URL every endpoint is resolved against
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(origin) => format!("{}{}", origin, self.base_path),
            None => self.base_path.clone(),
        }
    }

    /// Build the full URL for an endpoint path
    pub fn api_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_base_url(), endpoint)
        } else {
            format!("{}/{}", self.api_base_url(), endpoint)
        }
    }

    /// Whether a path targets an endpoint that must never trigger a refresh
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        path.contains(&self.refresh_endpoint) || path.contains(&self.login_endpoint)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

fn parse_seconds(key: &str, raw: &str) -> ClientResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| config_invalid(key, raw, e))
}
