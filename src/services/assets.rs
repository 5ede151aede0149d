use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, IntoActiveModel, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::db::DbPool;
use crate::entities::asset::{self, AssetStatus, Model as Asset};
use crate::entities::audit_log::{AuditAction, AuditModule};
use crate::entities::{asset_type, user, SoftDeletable};
use crate::errors::ServiceError;
use crate::repositories::{AssetFilter, AssetRepository, Page};
use crate::services::audit::AuditService;

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::new("price_must_be_positive"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name_required"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AssetInput {
    #[validate(length(max = 255), custom = "validate_name")]
    pub name: String,
    #[validate(custom = "validate_price")]
    pub price: f64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default)]
    pub status: AssetStatus,
    pub asset_type_id: i32,
    pub purchase_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub device_code: Option<String>,
    #[validate(length(max = 100))]
    pub condition_label: Option<String>,
    pub user_id: Option<i32>,
    #[validate(length(max = 255))]
    pub user_text: Option<String>,
    pub notes: Option<String>,
    /// Prefixed to the notes when given
    #[validate(range(min = 0))]
    pub usage_months: Option<i32>,
    /// Prefixed to the notes when given
    #[validate(range(min = 0, max = 100))]
    pub condition_percent: Option<i32>,
}

/// Notes with the usage and condition summary line in front, e.g.
/// `"Usage: 12 months; Condition: 80%.\nKeep dry"`
pub fn compose_notes(
    usage_months: Option<i32>,
    condition_percent: Option<i32>,
    notes: Option<String>,
) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(months) = usage_months {
        parts.push(format!("Usage: {} months", months));
    }
    if let Some(percent) = condition_percent {
        parts.push(format!("Condition: {}%", percent));
    }
    if parts.is_empty() {
        return notes;
    }
    Some(format!("{}.\n{}", parts.join("; "), notes.unwrap_or_default()))
}

#[derive(Clone)]
pub struct AssetService {
    db_pool: Arc<DbPool>,
    audit: AuditService,
}

impl AssetService {
    pub fn new(db_pool: Arc<DbPool>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &AssetFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Asset>, ServiceError> {
        AssetRepository::paginate(&*self.db_pool, filter, page, per_page).await
    }

    pub async fn count(&self, filter: &AssetFilter) -> Result<u64, ServiceError> {
        AssetRepository::count(&*self.db_pool, filter).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<Asset, ServiceError> {
        AssetRepository::find_by_id(&*self.db_pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Asset", id))
    }

    async fn check_references(
        &self,
        input: &AssetInput,
        exclude_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let name = input.name.trim();
        if AssetRepository::find_by_name(db, name, exclude_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "an asset named '{}' already exists",
                name
            )));
        }
        let type_exists = asset_type::Entity::find_live()
            .filter(asset_type::Column::Id.eq(input.asset_type_id))
            .one(db)
            .await?
            .is_some();
        if !type_exists {
            return Err(ServiceError::ValidationError(format!(
                "asset type {} does not exist",
                input.asset_type_id
            )));
        }
        if let Some(user_id) = input.user_id {
            let user_exists = user::Entity::find_live()
                .filter(user::Column::Id.eq(user_id))
                .one(db)
                .await?
                .is_some();
            if !user_exists {
                return Err(ServiceError::ValidationError(format!(
                    "user {} does not exist",
                    user_id
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, actor: Option<i32>, input: AssetInput) -> Result<Asset, ServiceError> {
        input.validate()?;
        self.check_references(&input, None).await?;

        let name = input.name.trim().to_string();
        let model = asset::ActiveModel {
            name: Set(name.clone()),
            price: Set(input.price),
            quantity: Set(input.quantity),
            status: Set(input.status),
            purchase_date: Set(input.purchase_date),
            device_code: Set(input.device_code),
            condition_label: Set(input.condition_label),
            asset_type_id: Set(input.asset_type_id),
            user_id: Set(input.user_id),
            user_text: Set(input.user_text),
            notes: Set(compose_notes(
                input.usage_months,
                input.condition_percent,
                input.notes,
            )),
            deleted_at: Set(None),
            ..Default::default()
        };
        let created = model
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        info!(asset_id = created.id, "asset created");

        self.audit
            .record(
                actor,
                AuditModule::Assets,
                AuditAction::Create,
                Some(created.id),
                format!("name={}", name),
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        actor: Option<i32>,
        id: i32,
        input: AssetInput,
    ) -> Result<Asset, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        self.check_references(&input, Some(id)).await?;

        let name = input.name.trim().to_string();
        let mut active = existing.into_active_model();
        active.name = Set(name.clone());
        active.price = Set(input.price);
        active.quantity = Set(input.quantity);
        active.status = Set(input.status);
        active.purchase_date = Set(input.purchase_date);
        active.device_code = Set(input.device_code);
        active.condition_label = Set(input.condition_label);
        active.asset_type_id = Set(input.asset_type_id);
        active.user_id = Set(input.user_id);
        active.user_text = Set(input.user_text);
        active.notes = Set(compose_notes(
            input.usage_months,
            input.condition_percent,
            input.notes,
        ));
        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record(
                actor,
                AuditModule::Assets,
                AuditAction::Update,
                Some(id),
                format!("name={}", name),
            )
            .await;
        Ok(updated)
    }

    /// Moves the asset to the trash and marks it disposed
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let name = existing.name.clone();
        let mut active = existing.into_active_model();
        active.status = Set(AssetStatus::Disposed);
        active.deleted_at = Set(Some(Utc::now()));
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record(
                actor,
                AuditModule::Assets,
                AuditAction::Delete,
                Some(id),
                format!("name={}", name),
            )
            .await;
        Ok(())
    }
}
