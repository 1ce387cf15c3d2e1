//! Integration test harness for edulink
//! Builds gateways over the real reqwest transport

use std::sync::{Arc, Mutex};

use edulink_lib::auth::AuthUser;
use edulink_lib::{
    ApiConfig, ApiGateway, CredentialStorage, LoginRedirect, MemoryStorage, Session, TokenStore,
};

/// Redirect that remembers every login route it was sent to
#[derive(Default)]
pub struct RecordingRedirect {
    routes: Mutex<Vec<String>>,
}

impl RecordingRedirect {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self, login_route: &str) {
        self.routes.lock().unwrap().push(login_route.to_string());
    }
}

/// A gateway wired to a mock server plus handles to its collaborators
pub struct TestGateway {
    pub gateway: Arc<ApiGateway>,
    pub tokens: Arc<TokenStore>,
    pub redirect: Arc<RecordingRedirect>,
}

impl TestGateway {
    /// Gateway against `server_url` with in-memory credential storage
    pub async fn new(server_url: &str, initial: Option<Session>) -> Self {
        Self::with_storage(server_url, Arc::new(MemoryStorage::new()), initial).await
    }

    pub async fn with_storage(
        server_url: &str,
        storage: Arc<dyn CredentialStorage>,
        initial: Option<Session>,
    ) -> Self {
        let tokens = Arc::new(TokenStore::load(storage).await);
        if let Some(initial) = initial {
            tokens.set(initial, true).await;
        }

        let redirect = Arc::new(RecordingRedirect::default());
        let gateway = ApiGateway::with_reqwest(
            ApiConfig::with_base_url(server_url),
            tokens.clone(),
            redirect.clone(),
        )
        .expect("reqwest client should build");

        Self {
            gateway: Arc::new(gateway),
            tokens,
            redirect,
        }
    }
}

pub fn admin_session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: Some(access.to_string()),
        refresh_token: Some(refresh.to_string()),
        user: Some(AuthUser {
            user_id: "u-admin".to_string(),
            email: "admin@fpt.edu.vn".to_string(),
            role: Some("ADMIN".to_string()),
            avatar_url: None,
        }),
    }
}

/// Login/refresh response body wrapped in the backend envelope
pub fn login_body(access: &str, refresh: &str) -> String {
    serde_json::json!({
        "code": 1000,
        "result": {
            "accessToken": access,
            "refreshToken": refresh,
            "userId": "u-admin",
            "email": "admin@fpt.edu.vn",
            "role": "ADMIN",
            "profilePictureUrl": null
        }
    })
    .to_string()
}
