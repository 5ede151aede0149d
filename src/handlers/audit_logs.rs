use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    entities::audit_log::{AuditModule, Model as AuditLog},
    handlers::common::{empty_string_as_none, page_window},
    services::audit::AuditFilter,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub user_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "maintenance")]
    pub module: Option<AuditModule>,
    /// Inclusive, YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive, YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit entries, newest first", body = ApiResponse<PaginatedResponse<AuditLog>>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "audit"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<PaginatedResponse<AuditLog>> {
    let (page, per_page) = page_window(query.page, query.per_page, state.config.page_size);
    let filter = AuditFilter {
        user_id: query.user_id,
        module: query.module,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let entries = state.services.audit.list(&filter, page, per_page).await?;
    Ok(Json(ApiResponse::success(entries.into())))
}
