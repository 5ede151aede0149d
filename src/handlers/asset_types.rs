use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    entities::asset_type::Model as AssetType,
    handlers::common::{empty_string_as_none, page_window},
    services::asset_types::AssetTypeInput,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssetTypeListQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/asset-types",
    params(AssetTypeListQuery),
    responses(
        (status = 200, description = "Asset types listed", body = ApiResponse<PaginatedResponse<AssetType>>)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-types"
)]
pub async fn list_asset_types(
    State(state): State<AppState>,
    Query(query): Query<AssetTypeListQuery>,
) -> ApiResult<PaginatedResponse<AssetType>> {
    let (page, per_page) = page_window(query.page, query.per_page, state.config.page_size);
    let types = state
        .services
        .asset_types
        .list(query.search.as_deref(), page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(types.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset-types/{id}",
    params(("id" = i32, Path, description = "Asset type ID")),
    responses(
        (status = 200, description = "Asset type fetched", body = ApiResponse<AssetType>),
        (status = 404, description = "Asset type not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-types"
)]
pub async fn get_asset_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<AssetType> {
    let asset_type = state.services.asset_types.get(id).await?;
    Ok(Json(ApiResponse::success(asset_type)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset-types",
    request_body = AssetTypeInput,
    responses(
        (status = 200, description = "Asset type created", body = ApiResponse<AssetType>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-types"
)]
pub async fn create_asset_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AssetTypeInput>,
) -> ApiResult<AssetType> {
    let created = state
        .services
        .asset_types
        .create(Some(user.user_id), payload)
        .await?;
    Ok(Json(ApiResponse::with_message(created, "Asset type created")))
}

#[utoipa::path(
    put,
    path = "/api/v1/asset-types/{id}",
    params(("id" = i32, Path, description = "Asset type ID")),
    request_body = AssetTypeInput,
    responses(
        (status = 200, description = "Asset type updated", body = ApiResponse<AssetType>),
        (status = 404, description = "Asset type not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-types"
)]
pub async fn update_asset_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssetTypeInput>,
) -> ApiResult<AssetType> {
    let updated = state
        .services
        .asset_types
        .update(Some(user.user_id), id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(updated, "Asset type updated")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/asset-types/{id}",
    params(("id" = i32, Path, description = "Asset type ID")),
    responses(
        (status = 200, description = "Asset type moved to trash", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Asset type still in use", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset type not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-types"
)]
pub async fn delete_asset_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .asset_types
        .delete(Some(user.user_id), id)
        .await?;
    Ok(Json(ApiResponse::with_message((), "Asset type moved to trash")))
}
