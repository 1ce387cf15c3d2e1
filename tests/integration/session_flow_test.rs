//! End-to-end session flow: login, persisted restore, typed endpoint
use std::sync::Arc;

use edulink_lib::api::profile::get_my_profile;
use edulink_lib::{AuthService, CredentialStorage, FileStorage, StorageScope};

use super::test_harness::{login_body, TestGateway};

fn profile_body() -> String {
    serde_json::json!({
        "code": 1000,
        "result": {
            "userId": "u-admin",
            "email": "admin@fpt.edu.vn",
            "profilePictureUrl": null,
            "role": "ADMIN",
            "status": "ACTIVE",
            "emailVerified": true,
            "lastLoginAt": "2026-01-05T09:12:00",
            "loginCount": 12,
            "createdAt": "2025-08-20T10:00:00",
            "studentProfile": null,
            "teacherProfile": null
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_login_persists_and_restores_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/login")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({"email": "admin@fpt.edu.vn"}),
        ))
        .with_status(200)
        .with_body(login_body("a-1", "r-1"))
        .expect(1)
        .create_async()
        .await;
    let profile = server
        .mock("GET", "/api/v1/profile/me")
        .match_header("authorization", "Bearer a-1")
        .with_status(200)
        .with_body(profile_body())
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    {
        let storage = Arc::new(FileStorage::open(&path).await.unwrap());
        let t = TestGateway::with_storage(&server.url(), storage, None).await;
        let auth = AuthService::new(t.gateway.clone());

        let user = auth.login("admin@fpt.edu.vn", "secret", true).await.unwrap();
        assert_eq!(user.role.as_deref(), Some("ADMIN"));

        let me = get_my_profile(&t.gateway).await.unwrap();
        assert_eq!(me.login_count, 12);
    }

    // A fresh process restores the remembered session from disk
    let storage = Arc::new(FileStorage::open(&path).await.unwrap());
    assert_eq!(
        storage
            .get(StorageScope::Durable, "rememberMe")
            .await
            .unwrap()
            .as_deref(),
        Some("true")
    );
    let t = TestGateway::with_storage(&server.url(), storage, None).await;
    let session = t.tokens.current().await;
    assert!(session.is_admin());
    assert_eq!(session.access_token.as_deref(), Some("a-1"));

    let me = get_my_profile(&t.gateway).await.unwrap();
    assert_eq!(me.display_name(), "admin@fpt.edu.vn");
    profile.assert_async().await;
}

#[tokio::test]
async fn test_session_scoped_login_is_forgotten_on_restart() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/login")
        .with_status(200)
        .with_body(login_body("a-2", "r-2"))
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    {
        let storage = Arc::new(FileStorage::open(&path).await.unwrap());
        let t = TestGateway::with_storage(&server.url(), storage, None).await;
        AuthService::new(t.gateway.clone())
            .login("admin@fpt.edu.vn", "secret", false)
            .await
            .unwrap();
        assert!(t.tokens.current().await.is_authenticated());
    }

    let storage = Arc::new(FileStorage::open(&path).await.unwrap());
    let t = TestGateway::with_storage(&server.url(), storage, None).await;
    assert!(!t.tokens.current().await.is_authenticated());
}

#[tokio::test]
async fn test_profile_error_carries_backend_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/profile/me")
        .with_status(404)
        .with_body(r#"{"code":1004,"message":"USER_NOT_FOUND"}"#)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), None).await;
    let err = get_my_profile(&t.gateway).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "USER_NOT_FOUND");
}
