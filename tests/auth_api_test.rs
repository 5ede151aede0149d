//! Authentication, role gating and request plumbing through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "not-the-password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": common::ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new().await;

    for uri in ["/api/v1/home", "/api/v1/maintenance", "/api/v1/assets", "/api/v1/trash"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .request(Method::GET, "/api/v1/assets", None, Some("garbage.token.value"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_INVALID_TOKEN");
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;

    let response = app
        .request(Method::GET, "/api/v1/assets", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    for (method, uri) in [
        (Method::GET, "/api/v1/users"),
        (Method::GET, "/api/v1/roles"),
        (Method::GET, "/api/v1/audit-logs"),
    ] {
        let response = app.request(method, uri, None, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    let response = app
        .request(
            Method::POST,
            "/api/v1/trash/purge",
            Some(json!({ "module": "asset", "id": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn admin_manages_users() {
    let app = TestApp::new().await;

    let (status, roles) = app.call(Method::GET, "/api/v1/roles", None).await;
    assert_eq!(status, StatusCode::OK);
    let manager_id = roles["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "manager")
        .and_then(|r| r["id"].as_i64())
        .expect("manager role");

    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "maria",
                "email": "maria@example.com",
                "password": "s3cure-enough",
                "role_id": manager_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert!(created["data"].get("password_hash").is_none());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "maria",
                "email": "other@example.com",
                "password": "s3cure-enough",
                "role_id": manager_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let token = app.login("maria", "s3cure-enough").await;
    let response = app
        .request(Method::GET, "/api/v1/home", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, listed) = app
        .call(Method::GET, "/api/v1/users?search=mar", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"]["total"], 1);
}

#[tokio::test]
async fn admin_cannot_delete_own_account() {
    let app = TestApp::new().await;

    let (_, listed) = app
        .call(Method::GET, "/api/v1/users?search=admin", None)
        .await;
    let admin_id = listed["data"]["items"][0]["id"].as_i64().expect("admin id");

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/v1/users/{}", admin_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new().await;

    let response = app
        .request_with_header(Method::GET, "/api/v1/status", ("x-request-id", "it-req-42"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "it-req-42");
    let body = response_json(response).await;
    assert_eq!(body["meta"]["request_id"], "it-req-42");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["paths"]["/api/v1/maintenance"].is_object());
}
