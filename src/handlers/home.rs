use axum::{extract::State, response::Json};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    entities::{asset::AssetStatus, maintenance_record::Model as MaintenanceRecord},
    repositories::AssetFilter,
    services::{
        due::{classify_batch, notice_for, DueBreakdown, Notice},
        scheduler::ScheduleOutcome,
        today_utc,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct HomeStats {
    pub total_assets: u64,
    pub total_asset_types: u64,
    pub total_users: u64,
    pub active_assets: u64,
}

/// Landing page payload
#[derive(Debug, Serialize, ToSchema)]
pub struct HomeView {
    pub today: NaiveDate,
    pub stats: HomeStats,
    /// Records due within the window, soonest first and capped
    #[schema(value_type = Vec<crate::entities::maintenance_record::Model>)]
    pub due: Vec<MaintenanceRecord>,
    /// Counted over `due` only
    pub breakdown: DueBreakdown,
    pub notice: Option<Notice>,
    pub schedule: ScheduleOutcome,
}

#[utoipa::path(
    get,
    path = "/api/v1/home",
    responses(
        (status = 200, description = "Inventory summary and due maintenance", body = ApiResponse<HomeView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "home"
)]
pub async fn home(State(state): State<AppState>) -> ApiResult<HomeView> {
    let today = today_utc();
    let services = &state.services;

    // runs before reading so freshly generated schedules are listed
    let schedule = services.scheduler.ensure_schedules(today).await;

    let stats = HomeStats {
        total_assets: services.assets.count(&AssetFilter::default()).await?,
        total_asset_types: services.asset_types.count().await?,
        total_users: services.users.count().await?,
        active_assets: services
            .assets
            .count(&AssetFilter {
                status: Some(AssetStatus::Active),
                ..Default::default()
            })
            .await?,
    };

    let window_days = state.config.due_window_days;
    let due = services
        .due
        .list_due(today, window_days, state.config.due_list_limit)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "due list unavailable");
            Vec::new()
        });
    let breakdown = classify_batch(&due, today);
    let notice = notice_for(breakdown, window_days);

    Ok(Json(ApiResponse::success(HomeView {
        today,
        stats,
        due,
        breakdown,
        notice,
        schedule,
    })))
}
