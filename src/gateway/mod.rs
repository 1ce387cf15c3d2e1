//! Authenticated request gateway.
//!
//! Every backend call goes through [`ApiGateway::request`], which resolves the
//! URL, attaches the bearer token and, on a 401, renews the session once
//! (shared by all concurrent callers) before retrying the call a single time.

mod refresh;

pub use refresh::RefreshOutcome;

use std::collections::HashMap;
use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::token_store::TokenStore;
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::http_client::{HttpClient, HttpMethod, HttpResponse, ReqwestHttpClient};
use refresh::{Refresher, SingleFlight};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Sends the application to its login entry point
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self, login_route: &str);
}

/// Redirect that only records the event in the log
#[derive(Debug, Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self, login_route: &str) {
        warn!(route = %login_route, "Session expired, login required");
    }
}

/// Per-call request settings
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(HttpMethod::GET)
    }
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> ClientResult<Self> {
        self.body = Some(serde_json::to_string(value)?);
        Ok(self)
    }
}

/// Wraps outbound API calls with credentials and refresh-and-retry
pub struct ApiGateway {
    config: ApiConfig,
    client: Arc<dyn HttpClient>,
    tokens: Arc<TokenStore>,
    redirect: Arc<dyn LoginRedirect>,
    /// Refresh state is per gateway, never process-wide
    refresh: SingleFlight,
}

impl ApiGateway {
    pub fn new(
        config: ApiConfig,
        client: Arc<dyn HttpClient>,
        tokens: Arc<TokenStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Self {
        Self {
            config,
            client,
            tokens,
            redirect,
            refresh: SingleFlight::default(),
        }
    }

    /// Build a gateway on the reqwest transport, honoring the configured
    /// request timeout
    pub fn with_reqwest(
        config: ApiConfig,
        tokens: Arc<TokenStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> ClientResult<Self> {
        let client = match config.request_timeout() {
            Some(timeout) => {
                ReqwestHttpClient::with_timeout(timeout).map_err(ClientError::Transport)?
            }
            None => ReqwestHttpClient::new(),
        };
        Ok(Self::new(config, Arc::new(client), tokens, redirect))
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Issue a request against the backend.
    ///
    /// Non-2xx statuses are returned as responses. `Err` means the transport
    /// failed. A 401 triggers at most one refresh and one retry; a 401 on the
    /// retry is returned unchanged.
    pub async fn request(&self, path: &str, options: RequestOptions) -> ClientResult<HttpResponse> {
        let url = self.config.api_url(path);
        let (mut headers, attached_token) = self.build_headers(&options.headers).await;

        let response = self.send(&url, &options, headers.clone()).await?;

        if response.status() != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        if self.tokens.refresh_token().await.is_none() {
            debug!(path = %path, "Unauthorized without refresh token");
            return Ok(response);
        }

        if self.config.is_auth_endpoint(path) {
            debug!(path = %path, "Unauthorized on auth endpoint, not refreshing");
            return Ok(response);
        }

        match self.join_refresh(attached_token.as_deref()).await {
            RefreshOutcome::Refreshed(access_token) => {
                set_header(
                    &mut headers,
                    AUTHORIZATION.as_str(),
                    format!("Bearer {}", access_token),
                );
                debug!(path = %path, "Retrying request with refreshed token");
                self.send(&url, &options, headers).await
            }
            RefreshOutcome::Failed => {
                self.tokens.clear().await;
                self.redirect.redirect_to_login(&self.config.login_route);
                Ok(response)
            }
        }
    }

    pub async fn get(&self, path: &str) -> ClientResult<HttpResponse> {
        self.request(path, RequestOptions::new(HttpMethod::GET))
            .await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<HttpResponse> {
        self.request(path, RequestOptions::new(HttpMethod::DELETE))
            .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ClientResult<HttpResponse> {
        self.request(path, RequestOptions::new(HttpMethod::POST).json(body)?)
            .await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ClientResult<HttpResponse> {
        self.request(path, RequestOptions::new(HttpMethod::PUT).json(body)?)
            .await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ClientResult<HttpResponse> {
        self.request(path, RequestOptions::new(HttpMethod::PATCH).json(body)?)
            .await
    }

    /// Renew the session ahead of a 401, joining a refresh that is already
    /// running. A failure leaves the store as it was.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        self.join_refresh(None).await
    }

    async fn join_refresh(&self, stale_token: Option<&str>) -> RefreshOutcome {
        self.refresh
            .join_or_start(stale_token, &self.tokens, || Refresher {
                url: self.config.api_url(&self.config.refresh_endpoint),
                timeout: self.config.refresh_timeout(),
                client: Arc::clone(&self.client),
                tokens: Arc::clone(&self.tokens),
            })
            .await
    }

    /// Caller headers win; defaults fill content type and bearer token.
    /// Also returns the access token attached, if any.
    async fn build_headers(
        &self,
        caller: &HashMap<String, String>,
    ) -> (HashMap<String, String>, Option<String>) {
        let mut headers = caller.clone();
        let mut attached = None;

        if !has_header(&headers, CONTENT_TYPE.as_str()) {
            headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        }

        if !has_header(&headers, AUTHORIZATION.as_str()) {
            if let Some(token) = self.tokens.access_token().await {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
                attached = Some(token);
            }
        }

        (headers, attached)
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        headers: HashMap<String, String>,
    ) -> ClientResult<HttpResponse> {
        debug!(method = options.method.as_str(), url = %url, "Sending API request");

        let response = self
            .client
            .execute(options.method, url, headers, options.body.clone())
            .await
            .map_err(ClientError::Transport)?;

        debug!(status = response.status(), url = %url, "API response received");
        Ok(response)
    }
}

fn has_header(headers: &HashMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Replace a header regardless of the casing it was stored under
fn set_header(headers: &mut HashMap<String, String>, name: &str, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value);
}
