use serde::{Deserialize, Serialize};

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "profilePictureUrl", alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

/// Current credentials and identity of the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived bearer credential; present exactly when authenticated
    pub access_token: Option<String>,
    /// Longer-lived credential exchanged for a new access token
    pub refresh_token: Option<String>,
    pub user: Option<AuthUser>,
}

impl Session {
    /// An empty, unauthenticated session
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Role of the signed-in user, lowercased
    pub fn role(&self) -> Option<String> {
        self.user
            .as_ref()
            .and_then(|u| u.role.as_deref())
            .map(str::to_lowercase)
    }

    pub fn is_admin(&self) -> bool {
        self.role().as_deref() == Some("admin")
    }
}

/// Body returned by the login and refresh endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    pub profile_picture_url: Option<String>,
}

impl From<LoginResponse> for Session {
    fn from(response: LoginResponse) -> Self {
        Session {
            access_token: Some(response.access_token),
            refresh_token: Some(response.refresh_token),
            user: Some(AuthUser {
                user_id: response.user_id,
                email: response.email,
                role: response.role,
                avatar_url: response.profile_picture_url,
            }),
        }
    }
}
