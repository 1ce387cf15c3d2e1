//! Role-keyed route guard.

use serde::{Deserialize, Serialize};

use crate::auth::session::Session;

/// Route name admins land on
pub const ADMIN_HOME_ROUTE: &str = "admin-dashboard";

/// Access requirements attached to a route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    #[serde(default)]
    pub requires_auth: bool,
    /// Lowercase role the route is restricted to
    #[serde(default)]
    pub role: Option<String>,
    /// Only meant for signed-out users (login, password reset)
    #[serde(default)]
    pub guest: bool,
}

impl RouteMeta {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn guest() -> Self {
        Self {
            guest: true,
            ..Self::default()
        }
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            requires_auth: true,
            role: Some(role.into().to_lowercase()),
            guest: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectLogin,
    /// Send the user to their role's landing route
    RedirectHome(String),
}

/// Decide whether navigation to a route may proceed
pub fn check(meta: &RouteMeta, session: &Session) -> GuardDecision {
    if meta.requires_auth {
        if !session.is_authenticated() {
            return GuardDecision::RedirectLogin;
        }

        if let Some(required) = &meta.role {
            if session.role().as_deref() != Some(required.as_str()) {
                return GuardDecision::RedirectLogin;
            }
        }
    }

    // Student and teacher landing routes are not defined yet
    if meta.guest && session.is_admin() {
        return GuardDecision::RedirectHome(ADMIN_HOME_ROUTE.to_string());
    }

    GuardDecision::Proceed
}
