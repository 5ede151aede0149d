#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use asset_maintenance_api::{
    auth, build_router, config::AppConfig, db, entities::role, services::users::UserInput,
    AppState,
};

pub const ADMIN_PASSWORD: &str = "admin123";

/// Application router over a throwaway SQLite file, migrated and bootstrapped, with a
/// logged-in administrator.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("maintenance_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_integration_runs_0123456789".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        auth::bootstrap(&pool, &cfg)
            .await
            .expect("failed to bootstrap roles and admin");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());

        let mut app = Self {
            router,
            state,
            admin_token: String::new(),
            _dir: dir,
        };
        app.admin_token = app.login("admin", ADMIN_PASSWORD).await;
        app
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Logs in and returns the access token, panicking on failure
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {}", username);
        let body = response_json(response).await;
        body["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Creates an active account with the named role and returns its token
    pub async fn user_token(&self, username: &str, role_name: &str) -> String {
        let roles = self.state.services.users.roles().await.expect("roles");
        let role_id = roles
            .iter()
            .find(|r| r.name == role_name)
            .map(|r| r.id)
            .expect("role exists");
        self.state
            .services
            .users
            .create(
                None,
                UserInput {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    password: Some("integration-pass".to_string()),
                    role_id,
                    is_active: true,
                },
            )
            .await
            .expect("create user");
        self.login(username, "integration-pass").await
    }

    pub async fn staff_token(&self) -> String {
        self.user_token("staff", role::USER).await
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Unauthenticated request carrying one extra header
    pub async fn request_with_header(
        &self,
        method: Method,
        uri: &str,
        (name, value): (&str, &str),
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(name, value)
            .body(Body::empty())
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated as the administrator; returns the status and decoded body
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(self.admin_token())).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_asset_type(&self, name: &str) -> i64 {
        let (status, body) = self
            .call(Method::POST, "/api/v1/asset-types", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_i64().expect("asset type id")
    }

    pub async fn create_asset(&self, name: &str, asset_type_id: i64) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/assets",
                Some(json!({
                    "name": name,
                    "price": 1200.0,
                    "quantity": 1,
                    "asset_type_id": asset_type_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_i64().expect("asset id")
    }

    pub async fn create_record(&self, payload: Value) -> Value {
        let (status, body) = self
            .call(Method::POST, "/api/v1/maintenance", Some(payload))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"].clone()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    // axum extractor rejections answer in plain text
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
