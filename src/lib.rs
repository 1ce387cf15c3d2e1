//! Client for the school-management backend.
//!
//! [`ApiGateway`] is the entry point for every call: it attaches the bearer
//! token held by the [`TokenStore`] and transparently renews the session when
//! the backend answers 401.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod http_client;

pub use auth::{
    AuthService, AuthUser, CredentialStorage, FileStorage, MemoryStorage, Session, StorageScope,
    TokenStore,
};
pub use config::ApiConfig;
pub use error::{ClientError, ClientResult, ErrorCode};
pub use gateway::{ApiGateway, LogRedirect, LoginRedirect, RefreshOutcome, RequestOptions};
pub use http_client::{HttpClient, HttpMethod, HttpResponse, ReqwestHttpClient};
