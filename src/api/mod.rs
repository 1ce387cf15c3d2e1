//! Typed access to backend endpoints.
//!
//! The backend wraps most payloads as `{ code, message, result }`; some
//! endpoints answer with the bare payload. Both shapes decode through
//! [`decode_result`].

pub mod profile;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{api_error, decode_error, ClientResult};
use crate::http_client::HttpResponse;

/// Standard backend response wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

/// Decode the payload of a successful response.
///
/// Non-2xx responses become [`crate::ClientError::Api`] carrying the
/// backend's `message` when it sent one.
pub fn decode_result<T: DeserializeOwned>(response: &HttpResponse) -> ClientResult<T> {
    if !response.is_success() {
        return Err(error_from_response(response));
    }

    let value: serde_json::Value = response.json()?;
    match value.get("result").filter(|result| !result.is_null()) {
        Some(result) => serde_json::from_value(result.clone()).map_err(decode_error),
        None => serde_json::from_value(value).map_err(decode_error),
    }
}

/// Turn a failed response into an API error
pub fn error_from_response(response: &HttpResponse) -> crate::ClientError {
    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(response.body())
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| format!("Request failed ({})", response.status()));

    api_error(response.status(), message)
}
