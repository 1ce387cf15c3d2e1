use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use http::header::CONTENT_TYPE;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::decode_result;
use crate::auth::session::{LoginResponse, Session};
use crate::auth::token_store::TokenStore;
use crate::error::{ClientError, ClientResult};
use crate::http_client::HttpClient;

/// Result of one refresh attempt, shared by every caller that waited on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The session was renewed; carries the new access token
    Refreshed(String),
    Failed,
}

type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Everything a refresh needs, owned so the flight can outlive any one caller
#[derive(Clone)]
pub(crate) struct Refresher {
    pub(crate) url: String,
    pub(crate) timeout: Duration,
    pub(crate) client: Arc<dyn HttpClient>,
    pub(crate) tokens: Arc<TokenStore>,
}

impl Refresher {
    /// Exchange the stored refresh token for a new session.
    ///
    /// Never mutates the store on failure.
    pub(crate) async fn run(self) -> RefreshOutcome {
        match tokio::time::timeout(self.timeout, self.exchange()).await {
            Ok(Ok(session)) => {
                let access_token = session.access_token.clone().unwrap_or_default();
                let remember_me = self.tokens.remember_me().await;
                self.tokens.set(session, remember_me).await;
                info!("Access token refreshed");
                RefreshOutcome::Refreshed(access_token)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Token refresh failed");
                RefreshOutcome::Failed
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Token refresh timed out");
                RefreshOutcome::Failed
            }
        }
    }

    async fn exchange(&self) -> ClientResult<Session> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .await
            .ok_or_else(|| ClientError::RefreshFailed {
                reason: "no refresh token stored".to_string(),
            })?;

        let mut headers = HashMap::new();
        headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        let body = json!({ "refreshToken": refresh_token }).to_string();

        debug!(url = %self.url, "Requesting token refresh");
        let response = self
            .client
            .post(&self.url, headers, body)
            .await
            .map_err(ClientError::Transport)?;

        let renewed: LoginResponse = decode_result(&response)?;
        Ok(Session::from(renewed))
    }
}

struct Flight {
    id: u64,
    /// Access token carried by the request that started the flight
    stale_token: Option<String>,
    outcome: RefreshFlight,
    settled: bool,
}

/// At most one refresh in progress; late callers join the running one.
///
/// The refresh runs on its own task, so it completes and updates the store
/// even when every caller waiting on it is dropped.
#[derive(Default)]
pub(crate) struct SingleFlight {
    slot: Arc<Mutex<Option<Flight>>>,
    next_id: AtomicU64,
}

impl SingleFlight {
    /// Await the in-flight refresh, starting one with `refresher` if none runs.
    ///
    /// `stale_token` is the access token the rejected request carried. When a
    /// flight settled between the 401 and this call, the request gets that
    /// flight's outcome: the renewed token if the store holds a different one,
    /// or the same failure if the flight was started for this token.
    pub(crate) async fn join_or_start(
        &self,
        stale_token: Option<&str>,
        tokens: &TokenStore,
        refresher: impl FnOnce() -> Refresher,
    ) -> RefreshOutcome {
        let outcome = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(flight) if !flight.settled => {
                    debug!("Joining in-flight token refresh");
                    flight.outcome.clone()
                }
                _ => {
                    let current = tokens.access_token().await;
                    if let (Some(stale), Some(current)) = (stale_token, current) {
                        if current != stale {
                            debug!("Session renewed since request was sent");
                            return RefreshOutcome::Refreshed(current);
                        }
                    }

                    let settled_for_token = slot.as_ref().filter(|flight| {
                        stale_token.is_some() && flight.stale_token.as_deref() == stale_token
                    });
                    match settled_for_token {
                        Some(flight) => {
                            debug!("Reusing settled refresh for this token");
                            flight.outcome.clone()
                        }
                        None => {
                            let flight = self.start(refresher(), stale_token);
                            let outcome = flight.outcome.clone();
                            *slot = Some(flight);
                            outcome
                        }
                    }
                }
            }
        };

        outcome.await
    }

    /// Spawn the refresh; the task marks its flight settled before it resolves
    fn start(&self, refresher: Refresher, stale_token: Option<&str>) -> Flight {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.slot);

        let task = tokio::spawn(async move {
            let outcome = refresher.run().await;
            if let Some(flight) = slot.lock().await.as_mut().filter(|f| f.id == id) {
                flight.settled = true;
            }
            outcome
        });

        let outcome = task
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    warn!(error = %e, "Token refresh task did not complete");
                    RefreshOutcome::Failed
                })
            })
            .boxed()
            .shared();

        Flight {
            id,
            stale_token: stale_token.map(str::to_string),
            outcome,
            settled: false,
        }
    }

    /// True when no refresh is running
    #[cfg(test)]
    pub(crate) async fn is_idle(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .map_or(true, |flight| flight.settled)
    }
}
