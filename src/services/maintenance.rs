use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::db::DbPool;
use crate::entities::audit_log::{AuditAction, AuditModule};
use crate::entities::maintenance_record::{
    self, MaintenanceStatus, MaintenanceType, Model as MaintenanceRecord,
};
use crate::errors::ServiceError;
use crate::repositories::{
    AssetRepository, DueFilter, MaintenanceFilter, MaintenanceOrder, MaintenanceRepository, Page,
};
use crate::services::audit::AuditService;
use crate::services::due::window_end;
use crate::services::reports::{month_bounds, year_bounds};

/// Accepts a number, a numeric string, an empty string or nothing. Anything that does
/// not parse counts as zero.
pub fn deserialize_cost<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) if n.is_finite() => n,
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}

fn validate_cost(cost: f64) -> Result<(), ValidationError> {
    if cost < 0.0 {
        return Err(ValidationError::new("cost_must_not_be_negative"));
    }
    Ok(())
}

fn default_maintenance_type() -> MaintenanceType {
    MaintenanceType::Maintenance
}

/// Body of create and update requests
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct MaintenanceInput {
    pub asset_id: i32,
    /// Defaults to today
    pub maintenance_date: Option<NaiveDate>,
    #[serde(rename = "type", default = "default_maintenance_type")]
    pub maintenance_type: MaintenanceType,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub vendor: Option<String>,
    #[validate(length(max = 255))]
    pub person_in_charge: Option<String>,
    #[serde(default, deserialize_with = "deserialize_cost")]
    #[validate(custom = "validate_cost")]
    pub cost: f64,
    pub next_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MaintenanceStatus,
}

/// List filters as accepted from callers
#[derive(Debug, Clone, Default)]
pub struct MaintenanceQuery {
    pub asset_id: Option<i32>,
    pub search: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub overdue: bool,
    pub due_soon: bool,
}

/// Date range for a month and/or year filter. A month without a year means that month of
/// the current year.
pub fn resolve_period(
    month: Option<u32>,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<Option<(NaiveDate, NaiveDate)>, ServiceError> {
    match (month, year) {
        (None, None) => Ok(None),
        (None, Some(year)) => year_bounds(year)
            .map(Some)
            .ok_or_else(|| ServiceError::InvalidInput(format!("year {} is out of range", year))),
        (Some(month), year) => {
            let year = year.unwrap_or_else(|| today.year());
            month_bounds(year, month).map(Some).ok_or_else(|| {
                ServiceError::InvalidInput(format!("month must be between 1 and 12, got {}", month))
            })
        }
    }
}

#[derive(Clone)]
pub struct MaintenanceService {
    db_pool: Arc<DbPool>,
    audit: AuditService,
}

impl MaintenanceService {
    pub fn new(db_pool: Arc<DbPool>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<MaintenanceRecord, ServiceError> {
        MaintenanceRepository::find_by_id(&*self.db_pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Maintenance record", id))
    }

    /// Filtered page, newest maintenance first. Asking for overdue and due-soon records
    /// at once yields nothing, since no due date can be both.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &MaintenanceQuery,
        today: NaiveDate,
        window_days: i64,
        page: u64,
        per_page: u64,
    ) -> Result<Page<MaintenanceRecord>, ServiceError> {
        let maintenance_between = resolve_period(query.month, query.year, today)?;
        if query.overdue && query.due_soon {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
                page,
                per_page,
            });
        }
        let due = if query.overdue {
            Some(DueFilter::Before(today))
        } else if query.due_soon {
            Some(DueFilter::Between(today, window_end(today, window_days)))
        } else {
            None
        };
        let filter = MaintenanceFilter {
            asset_id: query.asset_id,
            search: query.search.clone(),
            maintenance_between,
            due,
        };
        MaintenanceRepository::paginate(
            &*self.db_pool,
            &filter,
            MaintenanceOrder::MaintenanceDateDesc,
            page,
            per_page,
        )
        .await
    }

    async fn ensure_asset(&self, asset_id: i32) -> Result<(), ServiceError> {
        AssetRepository::find_by_id(&*self.db_pool, asset_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::ValidationError(format!("asset {} does not exist", asset_id)))
    }

    #[instrument(skip(self, input), fields(asset_id = input.asset_id))]
    pub async fn create(
        &self,
        actor: Option<i32>,
        input: MaintenanceInput,
        today: NaiveDate,
    ) -> Result<MaintenanceRecord, ServiceError> {
        input.validate()?;
        self.ensure_asset(input.asset_id).await?;

        let record = maintenance_record::ActiveModel {
            asset_id: Set(input.asset_id),
            maintenance_date: Set(input.maintenance_date.unwrap_or(today)),
            maintenance_type: Set(input.maintenance_type),
            description: Set(input.description),
            vendor: Set(input.vendor),
            person_in_charge: Set(input.person_in_charge),
            cost: Set(input.cost),
            next_due_date: Set(input.next_due_date),
            status: Set(input.status),
            deleted_at: Set(None),
            ..Default::default()
        };
        let created = MaintenanceRepository::insert(&*self.db_pool, record).await?;
        info!(record_id = created.id, "maintenance record created");

        self.audit
            .record(
                actor,
                AuditModule::Maintenance,
                AuditAction::Create,
                Some(created.id),
                format!("asset_id={}", created.asset_id),
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        actor: Option<i32>,
        id: i32,
        input: MaintenanceInput,
    ) -> Result<MaintenanceRecord, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        if existing.asset_id != input.asset_id {
            self.ensure_asset(input.asset_id).await?;
        }

        let maintenance_date = input.maintenance_date.unwrap_or(existing.maintenance_date);
        let mut active = existing.into_active_model();
        active.asset_id = Set(input.asset_id);
        active.maintenance_date = Set(maintenance_date);
        active.maintenance_type = Set(input.maintenance_type);
        active.description = Set(input.description);
        active.vendor = Set(input.vendor);
        active.person_in_charge = Set(input.person_in_charge);
        active.cost = Set(input.cost);
        active.next_due_date = Set(input.next_due_date);
        active.status = Set(input.status);
        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record(
                actor,
                AuditModule::Maintenance,
                AuditAction::Update,
                Some(id),
                format!("asset_id={}", updated.asset_id),
            )
            .await;
        Ok(updated)
    }

    /// Moves the record to the trash
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let asset_id = existing.asset_id;
        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record(
                actor,
                AuditModule::Maintenance,
                AuditAction::Delete,
                Some(id),
                format!("asset_id={}", asset_id),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, insert_record, seed_asset, setup_db};
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;

    fn input(asset_id: i32, cost: serde_json::Value) -> MaintenanceInput {
        serde_json::from_value(json!({
            "asset_id": asset_id,
            "maintenance_date": "2024-03-01",
            "type": "repair",
            "description": "Replace fan",
            "cost": cost,
        }))
        .unwrap()
    }

    #[rstest]
    #[case(json!(150.5), 150.5)]
    #[case(json!("99"), 99.0)]
    #[case(json!(""), 0.0)]
    #[case(json!("abc"), 0.0)]
    #[case(json!(null), 0.0)]
    fn cost_is_lenient(#[case] raw: serde_json::Value, #[case] expected: f64) {
        assert_eq!(input(1, raw).cost, expected);
    }

    #[test]
    fn missing_cost_and_status_use_defaults() {
        let parsed: MaintenanceInput =
            serde_json::from_value(json!({ "asset_id": 1 })).unwrap();
        assert_eq!(parsed.cost, 0.0);
        assert_eq!(parsed.status, MaintenanceStatus::Completed);
        assert_eq!(parsed.maintenance_type, MaintenanceType::Maintenance);
    }

    #[test]
    fn negative_cost_fails_validation() {
        assert!(input(1, json!(-5)).validate().is_err());
    }

    #[rstest]
    #[case(Some(2), Some(2024), Some((date(2024, 2, 1), date(2024, 2, 29))))]
    #[case(None, Some(2023), Some((date(2023, 1, 1), date(2023, 12, 31))))]
    #[case(Some(7), None, Some((date(2025, 7, 1), date(2025, 7, 31))))]
    #[case(None, None, None)]
    fn period_resolution(
        #[case] month: Option<u32>,
        #[case] year: Option<i32>,
        #[case] expected: Option<(NaiveDate, NaiveDate)>,
    ) {
        let today = date(2025, 3, 3);
        assert_eq!(resolve_period(month, year, today).unwrap(), expected);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert_matches!(
            resolve_period(Some(13), Some(2024), date(2024, 1, 1)),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn create_update_delete_lifecycle() {
        let db = Arc::new(setup_db().await);
        let asset = seed_asset(&db, "Projector").await;
        let svc = MaintenanceService::new(db.clone(), AuditService::new(db.clone()));

        let created = svc
            .create(None, input(asset.id, json!("120")), date(2024, 3, 2))
            .await
            .unwrap();
        assert_eq!(created.cost, 120.0);
        assert_eq!(created.maintenance_date, date(2024, 3, 1));

        let mut change = input(asset.id, json!(80));
        change.status = MaintenanceStatus::InProgress;
        let updated = svc.update(None, created.id, change).await.unwrap();
        assert_eq!(updated.cost, 80.0);
        assert_eq!(updated.status, MaintenanceStatus::InProgress);

        svc.delete(None, created.id).await.unwrap();
        assert_matches!(svc.get(created.id).await, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_requires_live_asset() {
        let db = Arc::new(setup_db().await);
        let svc = MaintenanceService::new(db.clone(), AuditService::new(db.clone()));
        assert_matches!(
            svc.create(None, input(404, json!(1)), date(2024, 1, 1)).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn list_applies_period_and_due_filters() {
        let db = Arc::new(setup_db().await);
        let asset = seed_asset(&db, "Boiler").await;
        let today = date(2024, 5, 10);
        insert_record(&db, asset.id, date(2024, 5, 1), Some(date(2024, 5, 1)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 4, 1), Some(date(2024, 5, 30)), 0.0).await;
        insert_record(&db, asset.id, date(2023, 4, 1), None, 0.0).await;
        let svc = MaintenanceService::new(db.clone(), AuditService::new(db.clone()));

        let all = svc.list(&MaintenanceQuery::default(), today, 30, 1, 10).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].maintenance_date, date(2024, 5, 1));

        let in_2024 = MaintenanceQuery {
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(svc.list(&in_2024, today, 30, 1, 10).await.unwrap().total, 2);

        let overdue = MaintenanceQuery {
            overdue: true,
            ..Default::default()
        };
        assert_eq!(svc.list(&overdue, today, 30, 1, 10).await.unwrap().total, 1);

        let due_soon = MaintenanceQuery {
            due_soon: true,
            ..Default::default()
        };
        assert_eq!(svc.list(&due_soon, today, 30, 1, 10).await.unwrap().total, 1);

        let both = MaintenanceQuery {
            overdue: true,
            due_soon: true,
            ..Default::default()
        };
        assert_eq!(svc.list(&both, today, 30, 1, 10).await.unwrap().total, 0);
    }
}
