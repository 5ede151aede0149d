use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    entities::{role::Model as Role, user::Model as User},
    handlers::common::{empty_string_as_none, page_window},
    services::users::{UserFilter, UserInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Matched against username and email
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub role_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users listed", body = ApiResponse<PaginatedResponse<User>>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<User>> {
    let (page, per_page) = page_window(query.page, query.per_page, state.config.page_size);
    let filter = UserFilter {
        search: query.search,
        role_id: query.role_id,
    };
    let users = state.services.users.list(&filter, page, per_page).await?;
    Ok(Json(ApiResponse::success(users.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User fetched", body = ApiResponse<User>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<User> {
    let user = state.services.users.get(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = UserInput,
    responses(
        (status = 200, description = "User created", body = ApiResponse<User>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<UserInput>,
) -> ApiResult<User> {
    let created = state
        .services
        .users
        .create(Some(actor.user_id), payload)
        .await?;
    Ok(Json(ApiResponse::with_message(created, "User created")))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UserInput,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<User>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UserInput>,
) -> ApiResult<User> {
    let updated = state
        .services
        .users
        .update(Some(actor.user_id), id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(updated, "User updated")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User moved to trash", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Own account or user still owns assets", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .users
        .delete(Some(actor.user_id), id)
        .await?;
    Ok(Json(ApiResponse::with_message((), "User moved to trash")))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    responses(
        (status = 200, description = "Roles listed", body = ApiResponse<Vec<Role>>)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    let roles = state.services.users.roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}
