use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::session::{AuthUser, Session};
use crate::auth::storage::{CredentialStorage, StorageScope};

// Persisted keys, identical in both scopes
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
/// Global durability preference, always kept in the durable scope
pub const REMEMBER_ME_KEY: &str = "rememberMe";

const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

#[derive(Debug, Clone, Default)]
struct StoreState {
    session: Session,
    remember_me: bool,
}

/// Holds the current session and mirrors it into credential storage.
///
/// Writes are best-effort: storage failures are logged and the in-memory
/// session stays authoritative. `set` and `clear` hold the state lock until
/// storage is written, so memory and storage always end on the same write.
pub struct TokenStore {
    storage: Arc<dyn CredentialStorage>,
    state: RwLock<StoreState>,
}

impl TokenStore {
    /// Create an empty store without reading persisted state
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            storage,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Create a store and restore the session from the scope the durability
    /// preference points at
    pub async fn load(storage: Arc<dyn CredentialStorage>) -> Self {
        let remember_me = match storage.get(StorageScope::Durable, REMEMBER_ME_KEY).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read durability preference");
                false
            }
        };
        let scope = scope_for(remember_me);

        let access_token = read_key(storage.as_ref(), scope, ACCESS_TOKEN_KEY).await;
        let refresh_token = read_key(storage.as_ref(), scope, REFRESH_TOKEN_KEY).await;
        let user = read_key(storage.as_ref(), scope, USER_KEY)
            .await
            .and_then(|raw| match serde_json::from_str::<AuthUser>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed persisted user record");
                    None
                }
            });

        let session = Session {
            access_token,
            refresh_token,
            user,
        };

        debug!(
            ?scope,
            authenticated = session.is_authenticated(),
            "Restored session from storage"
        );

        Self {
            storage,
            state: RwLock::new(StoreState {
                session,
                remember_me,
            }),
        }
    }

    /// Snapshot of the current session
    pub async fn current(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.session.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.session.refresh_token.clone()
    }

    /// Whether credentials are persisted across restarts
    pub async fn remember_me(&self) -> bool {
        self.state.read().await.remember_me
    }

    /// Replace the session and persist it in the scope selected by
    /// `persist_durable`, clearing the other scope
    pub async fn set(&self, session: Session, persist_durable: bool) {
        let mut state = self.state.write().await;
        state.session = session.clone();
        state.remember_me = persist_durable;

        let scope = scope_for(persist_durable);
        self.write_scope(scope, &session).await;
        self.clear_scope(scope.other()).await;

        let preference = if persist_durable { "true" } else { "false" };
        if let Err(e) = self
            .storage
            .set(StorageScope::Durable, REMEMBER_ME_KEY, preference.to_string())
            .await
        {
            warn!(error = %e, "Failed to persist durability preference");
        }

        drop(state);
        info!(?scope, "Session stored");
    }

    /// Forget the session in memory and in both scopes
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.session = Session::empty();

        self.clear_scope(StorageScope::Durable).await;
        self.clear_scope(StorageScope::Session).await;

        drop(state);
        info!("Session cleared");
    }

    async fn write_scope(&self, scope: StorageScope, session: &Session) {
        let user = match session.user.as_ref().map(serde_json::to_string).transpose() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user record");
                None
            }
        };

        let entries = [
            (ACCESS_TOKEN_KEY, session.access_token.clone()),
            (REFRESH_TOKEN_KEY, session.refresh_token.clone()),
            (USER_KEY, user),
        ];

        for (key, value) in entries {
            let result = match value {
                Some(value) => self.storage.set(scope, key, value).await,
                None => self.storage.remove(scope, key).await,
            };
            if let Err(e) = result {
                warn!(error = %e, ?scope, key, "Failed to write credential entry");
            }
        }
    }

    async fn clear_scope(&self, scope: StorageScope) {
        for key in CREDENTIAL_KEYS {
            if let Err(e) = self.storage.remove(scope, key).await {
                warn!(error = %e, ?scope, key, "Failed to remove credential entry");
            }
        }
    }
}

fn scope_for(persist_durable: bool) -> StorageScope {
    if persist_durable {
        StorageScope::Durable
    } else {
        StorageScope::Session
    }
}

async fn read_key(storage: &dyn CredentialStorage, scope: StorageScope, key: &str) -> Option<String> {
    match storage.get(scope, key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, ?scope, key, "Failed to read credential entry");
            None
        }
    }
}
