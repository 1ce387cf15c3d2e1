use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ClientResult;

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
        }
    }
}

/// Fully buffered response data
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    status_code: u16,
    /// Response body
    body: String,
    /// Response headers, names lowercased
    headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Get a reference to the response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get the body as text (consumes the response)
    pub fn text(self) -> String {
        self.body
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Check if successful (2xx status)
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Trait for HTTP client operations, allowing for mocking
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform an HTTP request. Non-2xx statuses are responses, not errors;
    /// `Err` means no response was obtained.
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> Result<HttpResponse>;

    /// Perform HTTP GET request
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<HttpResponse> {
        self.execute(HttpMethod::GET, url, headers, None).await
    }

    /// Perform HTTP POST request
    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<HttpResponse> {
        self.execute(HttpMethod::POST, url, headers, Some(body)).await
    }
}

/// Implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    /// Internal reqwest client
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.request(method.into(), url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|value| (k.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        let result = response_headers
            .into_iter()
            .fold(HttpResponse::new(status, body), |acc, (k, v)| {
                acc.with_header(k, v)
            });

        Ok(result)
    }
}
