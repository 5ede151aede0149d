use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    handlers::common::empty_string_as_none,
    services::trash::{TrashItem, TrashModule, TrashTarget},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrashQuery {
    /// One of asset, asset_type, user, maintenance or all (default)
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "all")]
    pub module: Option<TrashModule>,
}

#[utoipa::path(
    get,
    path = "/api/v1/trash",
    params(TrashQuery),
    responses(
        (status = 200, description = "Soft-deleted items, most recently deleted first", body = ApiResponse<Vec<TrashItem>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "trash"
)]
pub async fn list_trash(
    State(state): State<AppState>,
    Query(query): Query<TrashQuery>,
) -> ApiResult<Vec<TrashItem>> {
    let items = state
        .services
        .trash
        .list(query.module.unwrap_or_default())
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trash/restore",
    request_body = TrashTarget,
    responses(
        (status = 200, description = "Item restored", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Item cannot be restored", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item is not in the trash", body = crate::errors::ErrorResponse),
        (status = 409, description = "A live item already uses the name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "trash"
)]
pub async fn restore_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(target): Json<TrashTarget>,
) -> ApiResult<()> {
    state
        .services
        .trash
        .restore(Some(user.user_id), target)
        .await?;
    Ok(Json(ApiResponse::with_message((), "Item restored")))
}

#[utoipa::path(
    post,
    path = "/api/v1/trash/purge",
    request_body = TrashTarget,
    responses(
        (status = 200, description = "Item permanently deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Item cannot be purged", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item is not in the trash", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "trash"
)]
pub async fn purge_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(target): Json<TrashTarget>,
) -> ApiResult<()> {
    state
        .services
        .trash
        .purge(Some(user.user_id), target)
        .await?;
    Ok(Json(ApiResponse::with_message((), "Item permanently deleted")))
}
