use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::decode_result;
use crate::auth::session::{AuthUser, LoginResponse, Session};
use crate::error::{ClientError, ClientResult};
use crate::gateway::ApiGateway;

const CHANGE_PASSWORD_ENDPOINT: &str = "/users/me/change-password";

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for changing the signed-in user's password
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
    /// Revoke sessions on other devices; the backend default is on
    pub logout_other_devices: bool,
}

impl ChangePasswordRequest {
    pub fn new(current_password: impl Into<String>, new_password: impl Into<String>) -> Self {
        let new_password = new_password.into();
        Self {
            current_password: current_password.into(),
            confirm_password: new_password.clone(),
            new_password,
            logout_other_devices: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordResponse {
    pub message: String,
    pub logged_out_devices: u32,
}

/// Session lifecycle operations on top of the gateway
pub struct AuthService {
    gateway: Arc<ApiGateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Current session snapshot
    pub async fn session(&self) -> Session {
        self.gateway.tokens().current().await
    }

    /// Exchange credentials for a session, persisted durably when `remember_me`
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> ClientResult<AuthUser> {
        let login_endpoint = self.gateway.config().login_endpoint.clone();
        let response = self
            .gateway
            .post_json(&login_endpoint, &LoginRequest { email, password })
            .await?;

        let login: LoginResponse = decode_result(&response).map_err(|e| {
            warn!(error = %e, "Login rejected");
            e
        })?;

        let session = Session::from(login);
        let user = session.user.clone().ok_or_else(|| ClientError::Decode {
            reason: "login response carried no user".to_string(),
        })?;

        self.gateway.tokens().set(session, remember_me).await;
        info!(user_id = %user.user_id, remember_me, "Logged in");

        Ok(user)
    }

    /// Forget the local session. The backend keeps no logout endpoint.
    pub async fn logout(&self) {
        self.gateway.tokens().clear().await;
        info!("Logged out");
    }

    /// Change the password. The backend revokes every refresh token on
    /// success, so the local session is dropped as well.
    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> ClientResult<ChangePasswordResponse> {
        let response = self
            .gateway
            .post_json(CHANGE_PASSWORD_ENDPOINT, request)
            .await?;
        let result: ChangePasswordResponse = decode_result(&response)?;

        info!(
            logged_out_devices = result.logged_out_devices,
            "Password changed, session revoked"
        );
        self.gateway.tokens().clear().await;

        Ok(result)
    }
}
