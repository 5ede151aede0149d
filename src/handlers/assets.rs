use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    entities::asset::{AssetStatus, Model as Asset},
    handlers::common::{empty_string_as_none, page_window},
    repositories::AssetFilter,
    services::assets::AssetInput,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssetListQuery {
    /// Matched against name, device code and assigned user text
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub type_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "active")]
    pub status: Option<AssetStatus>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/assets",
    params(AssetListQuery),
    responses(
        (status = 200, description = "Assets listed", body = ApiResponse<PaginatedResponse<Asset>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
) -> ApiResult<PaginatedResponse<Asset>> {
    let (page, per_page) = page_window(query.page, query.per_page, state.config.page_size);
    let filter = AssetFilter {
        search: query.search,
        asset_type_id: query.type_id,
        status: query.status,
    };
    let assets = state.services.assets.list(&filter, page, per_page).await?;
    Ok(Json(ApiResponse::success(assets.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset fetched", body = ApiResponse<Asset>),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn get_asset(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Asset> {
    let asset = state.services.assets.get(id).await?;
    Ok(Json(ApiResponse::success(asset)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assets",
    request_body = AssetInput,
    responses(
        (status = 200, description = "Asset created", body = ApiResponse<Asset>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Asset name already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn create_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AssetInput>,
) -> ApiResult<Asset> {
    let created = state
        .services
        .assets
        .create(Some(user.user_id), payload)
        .await?;
    Ok(Json(ApiResponse::with_message(created, "Asset created")))
}

#[utoipa::path(
    put,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body = AssetInput,
    responses(
        (status = 200, description = "Asset updated", body = ApiResponse<Asset>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Asset name already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssetInput>,
) -> ApiResult<Asset> {
    let updated = state
        .services
        .assets
        .update(Some(user.user_id), id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(updated, "Asset updated")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset disposed and moved to trash", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .assets
        .delete(Some(user.user_id), id)
        .await?;
    Ok(Json(ApiResponse::with_message((), "Asset moved to trash")))
}
