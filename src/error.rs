use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Transport errors
    NetworkFailure,

    // API related errors
    ApiRequestFailed,
    ApiDecodeFailed,

    // Authentication errors
    AuthRefreshFailed,

    // Configuration related errors
    ConfigInvalid,
    ConfigMissing,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::NetworkFailure => "network_failure",
            ErrorCode::ApiRequestFailed => "api_request_failed",
            ErrorCode::ApiDecodeFailed => "api_decode_failed",
            ErrorCode::AuthRefreshFailed => "auth_refresh_failed",
            ErrorCode::ConfigInvalid => "config_invalid",
            ErrorCode::ConfigMissing => "config_missing",
        };
        write!(f, "{}", code)
    }
}

/// Errors surfaced by the client
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, timeout)
    #[error("Transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// A response body did not have the expected shape
    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },

    /// The backend answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The session could not be renewed
    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("Configuration key '{key}' is missing")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for '{key}': '{value}' ({reason})")]
    ConfigInvalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ClientError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Transport(_) => ErrorCode::NetworkFailure,
            ClientError::Decode { .. } => ErrorCode::ApiDecodeFailed,
            ClientError::Api { .. } => ErrorCode::ApiRequestFailed,
            ClientError::RefreshFailed { .. } => ErrorCode::AuthRefreshFailed,
            ClientError::ConfigMissing { .. } => ErrorCode::ConfigMissing,
            ClientError::ConfigInvalid { .. } => ErrorCode::ConfigInvalid,
        }
    }

    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode {
            reason: err.to_string(),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

// Helper functions for creating common errors

pub fn api_error(status: u16, message: impl Into<String>) -> ClientError {
    ClientError::Api {
        status,
        message: message.into(),
    }
}

pub fn decode_error(reason: impl fmt::Display) -> ClientError {
    ClientError::Decode {
        reason: reason.to_string(),
    }
}

pub fn config_missing(key: &str) -> ClientError {
    ClientError::ConfigMissing {
        key: key.to_string(),
    }
}

pub fn config_invalid(key: &str, value: &str, reason: impl fmt::Display) -> ClientError {
    ClientError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
