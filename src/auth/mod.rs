/*!
 * # Authentication and Authorization Module
 *
 * Username/password login issuing HS256 JWT access tokens, a middleware that validates
 * bearer tokens and stores the caller in request extensions, and role gating where the
 * `admin` role passes every check.
 *
 * Startup bootstrap seeds the default roles and the configured administrator account.
 */

use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::entities::{role, user, SoftDeletable};
use crate::errors::ServiceError;

pub mod password;

use password::{hash_password, verify_password};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub username: String,   // Login name
    pub roles: Vec<String>, // Role names
    pub jti: String,        // JWT ID
    pub iat: i64,           // Issued at
    pub exp: i64,           // Expiration time
    pub nbf: i64,           // Not valid before
    pub iss: String,        // Issuer
    pub aud: String,        // Audience
}

/// Authenticated caller extracted from the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Admins hold every role
    pub fn has_role(&self, role: &str) -> bool {
        self.is_admin() || self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == role::ADMIN)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Authentication service that handles login and token validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Issues an access token for `user` carrying `roles`
    pub fn generate_token(
        &self,
        user: &user::Model,
        roles: Vec<String>,
    ) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(self.config.access_token_expiration)
            .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            roles,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
        })
    }

    /// Validates signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Checks credentials of a live, active user, records the login time and returns a token
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, AuthError> {
        let db = &*self.db;
        let account = user::Entity::find_live()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .one(db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = verify_password(&request.password, &account.password_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        if !matches {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let roles = role::Entity::find_by_id(account.role_id)
            .one(db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .map(|r| vec![r.name])
            .unwrap_or_default();

        let mut active = account.clone().into_active_model();
        active.last_login = Set(Some(Utc::now()));
        active
            .update(db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        info!(user_id = account.id, "user logged in");
        self.generate_token(&account, roles)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "AUTH_ACCOUNT_DISABLED",
                "Account is disabled".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Could not issue a token".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "AUTH_INVALID_REQUEST",
                msg.clone(),
            ),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            warn!(error = %self, "authentication failure");
        }

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "request_id": crate::tracing::current_request_id().map(|id| id.as_str().to_string()),
        }));

        (status, body).into_response()
    }
}

/// Role middleware; runs after [`auth_middleware`]
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Validates the bearer token and stores the caller as an [`AuthUser`] extension
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingAuth)?;

    let claims = auth_service.validate_token(token)?;
    let user_id = claims.sub.parse::<i32>().map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        username: claims.username,
        roles: claims.roles,
        token_id: claims.jti,
    })
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/login", axum::routing::post(login_handler))
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Exchange username and password for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled"),
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    credentials
        .validate()
        .map_err(|e| AuthError::InvalidRequest(e.to_string()))?;
    let token = auth_service.login(&credentials).await?;
    Ok(Json(token))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

/// Inserts any of the default roles that are missing; returns how many were added
pub async fn bootstrap_roles(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let mut added = 0;
    for (name, description) in role::DEFAULT_ROLES {
        let exists = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if !exists {
            role::ActiveModel {
                name: Set(name.to_string()),
                description: Set(Some(description.to_string())),
                ..Default::default()
            }
            .insert(db)
            .await?;
            added += 1;
        }
    }
    Ok(added)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub roles_created: u64,
    pub admin_created: bool,
}

/// Seeds roles and the administrator account described by `cfg`
#[instrument(skip(db, cfg))]
pub async fn bootstrap(db: &DatabaseConnection, cfg: &AppConfig) -> Result<BootstrapReport, ServiceError> {
    let roles_created = bootstrap_roles(db).await?;

    let admin_exists = user::Entity::find()
        .filter(user::Column::Username.eq(cfg.admin_username.as_str()))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(BootstrapReport {
            roles_created,
            admin_created: false,
        });
    }

    let Some(password) = cfg.bootstrap_admin_password() else {
        warn!("no admin password configured; skipping administrator bootstrap");
        return Ok(BootstrapReport {
            roles_created,
            admin_created: false,
        });
    };

    let admin_role = role::Entity::find()
        .filter(role::Column::Name.eq(role::ADMIN))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::InternalError("admin role missing".to_string()))?;

    user::ActiveModel {
        username: Set(cfg.admin_username.clone()),
        email: Set(cfg.admin_email.clone()),
        password_hash: Set(hash_password(password)?),
        role_id: Set(admin_role.id),
        is_active: Set(true),
        last_login: Set(None),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(username = %cfg.admin_username, "administrator account created");

    Ok(BootstrapReport {
        roles_created,
        admin_created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;
    use assert_matches::assert_matches;

    const SECRET: &str = "maintenance_signing_key_for_unit_tests_Q7zX";

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            SECRET.into(),
            3600,
            "127.0.0.1".into(),
            0,
            "test".into(),
        )
    }

    async fn service() -> AuthService {
        let db = setup_db().await;
        bootstrap(&db, &config()).await.unwrap();
        AuthService::new(AuthConfig::from(&config()), Arc::new(db))
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn admin_passes_every_role_check() {
        let admin = AuthUser {
            user_id: 1,
            username: "admin".into(),
            roles: vec![role::ADMIN.into()],
            token_id: "t".into(),
        };
        assert!(admin.has_role(role::MANAGER));
        let clerk = AuthUser {
            roles: vec![role::USER.into()],
            ..admin
        };
        assert!(!clerk.has_role(role::ADMIN));
        assert!(clerk.has_role(role::USER));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let db = setup_db().await;
        let first = bootstrap(&db, &config()).await.unwrap();
        assert_eq!(first.roles_created, 3);
        assert!(first.admin_created);
        let second = bootstrap(&db, &config()).await.unwrap();
        assert_eq!(second, BootstrapReport::default());
    }

    #[tokio::test]
    async fn login_issues_valid_token() {
        let svc = service().await;
        let token = svc.login(&login("admin", "admin123")).await.unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let claims = svc.validate_token(&token.access_token).unwrap();
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.roles, vec![role::ADMIN.to_string()]);

        let stored = user::Entity::find()
            .filter(user::Column::Username.eq("admin"))
            .one(&*svc.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let svc = service().await;
        assert_matches!(
            svc.login(&login("admin", "nope")).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_matches!(
            svc.login(&login("ghost", "admin123")).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn token_for_other_audience_is_rejected() {
        let svc = service().await;
        let token = svc.login(&login("admin", "admin123")).await.unwrap();
        let mut other = svc.clone();
        other.config.jwt_audience = "someone-else".into();
        assert_matches!(
            other.validate_token(&token.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn disabled_account_cannot_log_in() {
        let svc = service().await;
        let admin = user::Entity::find()
            .filter(user::Column::Username.eq("admin"))
            .one(&*svc.db)
            .await
            .unwrap()
            .unwrap();
        let mut active = admin.into_active_model();
        active.is_active = Set(false);
        active.update(&*svc.db).await.unwrap();

        assert_matches!(
            svc.login(&login("admin", "admin123")).await,
            Err(AuthError::AccountDisabled)
        );
    }
}
