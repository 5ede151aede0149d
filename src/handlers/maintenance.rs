use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AuthUser,
    entities::maintenance_record::Model as MaintenanceRecord,
    handlers::common::{empty_string_as_none, flag, page_window},
    services::{
        maintenance::{MaintenanceInput, MaintenanceQuery},
        reports::{Dashboard, DashboardLimits, MonthlyCostReport},
        scheduler::ScheduleOutcome,
        today_utc,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaintenanceListQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub asset_id: Option<i32>,
    /// Matched against description, vendor and person in charge
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub month: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    /// Only records whose next due date has passed
    #[serde(default, deserialize_with = "flag")]
    #[param(value_type = Option<bool>)]
    pub overdue: bool,
    /// Only records due within the configured window
    #[serde(default, deserialize_with = "flag")]
    #[param(value_type = Option<bool>)]
    pub due_30: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Defaults to the current year
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardView {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub schedule: ScheduleOutcome,
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance",
    params(MaintenanceListQuery),
    responses(
        (status = 200, description = "Maintenance records listed", body = ApiResponse<PaginatedResponse<MaintenanceRecord>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<MaintenanceListQuery>,
) -> ApiResult<PaginatedResponse<MaintenanceRecord>> {
    let (page, per_page) = page_window(query.page, query.per_page, state.config.page_size);
    let filters = MaintenanceQuery {
        asset_id: query.asset_id,
        search: query.search,
        month: query.month,
        year: query.year,
        overdue: query.overdue,
        due_soon: query.due_30,
    };

    let records = state
        .services
        .maintenance
        .list(
            &filters,
            today_utc(),
            state.config.due_window_days,
            page,
            per_page,
        )
        .await?;

    Ok(Json(ApiResponse::success(records.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/{id}",
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 200, description = "Maintenance record fetched", body = ApiResponse<MaintenanceRecord>),
        (status = 404, description = "Maintenance record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<MaintenanceRecord> {
    let record = state.services.maintenance.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance",
    request_body = MaintenanceInput,
    responses(
        (status = 200, description = "Maintenance record created", body = ApiResponse<MaintenanceRecord>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn create_record(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MaintenanceInput>,
) -> ApiResult<MaintenanceRecord> {
    let created = state
        .services
        .maintenance
        .create(Some(user.user_id), payload, today_utc())
        .await?;
    Ok(Json(ApiResponse::with_message(
        created,
        "Maintenance record created",
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/maintenance/{id}",
    params(("id" = i32, Path, description = "Maintenance record ID")),
    request_body = MaintenanceInput,
    responses(
        (status = 200, description = "Maintenance record updated", body = ApiResponse<MaintenanceRecord>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Maintenance record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn update_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<MaintenanceInput>,
) -> ApiResult<MaintenanceRecord> {
    let updated = state
        .services
        .maintenance
        .update(Some(user.user_id), id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        "Maintenance record updated",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/maintenance/{id}",
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 200, description = "Maintenance record moved to trash", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Maintenance record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .maintenance
        .delete(Some(user.user_id), id)
        .await?;
    Ok(Json(ApiResponse::with_message(
        (),
        "Maintenance record moved to trash",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Monthly maintenance cost for a year", body = ApiResponse<MonthlyCostReport>),
        (status = 400, description = "Year out of range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn cost_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<MonthlyCostReport> {
    let year = query.year.unwrap_or_else(|| today_utc().year());
    let report = state.services.reports.monthly_cost_report(year).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/dashboard",
    responses(
        (status = 200, description = "Maintenance KPIs, due work and recent activity", body = ApiResponse<DashboardView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardView> {
    let today = today_utc();
    let services = &state.services;
    let schedule = services.scheduler.ensure_schedules(today).await;

    let limits = DashboardLimits {
        window_days: state.config.due_window_days,
        recent: state.config.dashboard_recent_limit,
        overdue: state.config.due_list_limit,
    };
    let dashboard = services
        .reports
        .dashboard(&services.due, today, limits)
        .await;

    Ok(Json(ApiResponse::success(DashboardView {
        dashboard,
        schedule,
    })))
}
