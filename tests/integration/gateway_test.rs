//! Integration tests for the authenticated request gateway
use mockito::Matcher;
use serde_json::json;

use edulink_lib::{
    ApiConfig, ApiGateway, ClientError, LogRedirect, MemoryStorage, Session, TokenStore,
};

use super::test_harness::{admin_session, login_body, TestGateway};

#[tokio::test]
async fn test_bearer_token_reaches_backend() {
    let mut server = mockito::Server::new_async().await;
    let users = server
        .mock("GET", "/api/v1/admin/users")
        .match_header("authorization", "Bearer a-1")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_body(r#"{"result":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), Some(admin_session("a-1", "r-1"))).await;
    let response = t.gateway.get("/admin/users").await.unwrap();

    assert_eq!(response.status(), 200);
    users.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried() {
    let mut server = mockito::Server::new_async().await;
    let stale = server
        .mock("GET", "/api/v1/admin/classes")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/api/v1/admin/classes")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(r#"{"result":[{"classId":1}]}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/v1/auth/refresh-token")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"refreshToken": "r-old"})))
        .with_status(200)
        .with_body(login_body("new", "r-new"))
        .expect(1)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), Some(admin_session("old", "r-old"))).await;
    let response = t.gateway.get("/admin/classes").await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), r#"{"result":[{"classId":1}]}"#);
    stale.assert_async().await;
    fresh.assert_async().await;
    refresh.assert_async().await;

    let session = t.tokens.current().await;
    assert_eq!(session.access_token.as_deref(), Some("new"));
    assert_eq!(session.refresh_token.as_deref(), Some("r-new"));
}

#[tokio::test]
async fn test_rejected_refresh_logs_out_and_redirects() {
    let mut server = mockito::Server::new_async().await;
    let classes = server
        .mock("GET", "/api/v1/admin/classes")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/v1/auth/refresh-token")
        .with_status(400)
        .with_body(r#"{"code":1010,"message":"REFRESH_TOKEN_INVALID"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), Some(admin_session("old", "r-old"))).await;
    let response = t.gateway.get("/admin/classes").await.unwrap();

    assert_eq!(response.status(), 401);
    classes.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(t.tokens.current().await, Session::empty());
    assert_eq!(t.redirect.routes(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_refresh_endpoint_401_is_not_refreshed_again() {
    let mut server = mockito::Server::new_async().await;
    let refresh = server
        .mock("POST", "/api/v1/auth/refresh-token")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), Some(admin_session("old", "r-old"))).await;
    let response = t
        .gateway
        .post_json("/auth/refresh-token", &json!({"refreshToken": "r-old"}))
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    refresh.assert_async().await;
    assert!(t.tokens.current().await.is_authenticated());
    assert!(t.redirect.routes().is_empty());
}

#[tokio::test]
async fn test_server_errors_pass_through() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/v1/admin/courses/7")
        .with_status(409)
        .with_body(r#"{"message":"COURSE_HAS_CLASSES"}"#)
        .create_async()
        .await;

    let t = TestGateway::new(&server.url(), Some(admin_session("a-1", "r-1"))).await;
    let response = t.gateway.delete("/admin/courses/7").await.unwrap();

    assert_eq!(response.status(), 409);
    assert!(t.tokens.current().await.is_authenticated());
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let tokens = std::sync::Arc::new(TokenStore::new(std::sync::Arc::new(MemoryStorage::new())));
    let gateway = ApiGateway::with_reqwest(
        ApiConfig::with_base_url("http://127.0.0.1:9"),
        tokens,
        std::sync::Arc::new(LogRedirect),
    )
    .unwrap();

    let err = gateway.get("/admin/users").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}
