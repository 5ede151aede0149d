use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::asset_type::{self, Model as AssetType};
use crate::entities::audit_log::{AuditAction, AuditModule};
use crate::entities::{asset, SoftDeletable};
use crate::errors::ServiceError;
use crate::repositories::{search_condition, Page};
use crate::services::audit::AuditService;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AssetTypeInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct AssetTypeService {
    db_pool: Arc<DbPool>,
    audit: AuditService,
}

impl AssetTypeService {
    pub fn new(db_pool: Arc<DbPool>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<AssetType>, ServiceError> {
        let mut query = asset_type::Entity::find_live();
        if let Some(cond) = search.and_then(|term| search_condition(&[asset_type::Column::Name], term))
        {
            query = query.filter(cond);
        }
        let paginator = query
            .order_by_asc(asset_type::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(asset_type::Entity::find_live().count(&*self.db_pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<AssetType, ServiceError> {
        asset_type::Entity::find_live()
            .filter(asset_type::Column::Id.eq(id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Asset type", id))
    }

    async fn ensure_unique(&self, name: &str, exclude_id: Option<i32>) -> Result<(), ServiceError> {
        let mut query = asset_type::Entity::find_live().filter(asset_type::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(asset_type::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an asset type named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        actor: Option<i32>,
        input: AssetTypeInput,
    ) -> Result<AssetType, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        self.ensure_unique(&name, None).await?;

        let created = asset_type::ActiveModel {
            name: Set(name.clone()),
            description: Set(input.description),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        self.audit
            .record(
                actor,
                AuditModule::AssetTypes,
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
        input: AssetTypeInput,
    ) -> Result<AssetType, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let name = input.name.trim().to_string();
        self.ensure_unique(&name, Some(id)).await?;

        let mut active = existing.into_active_model();
        active.name = Set(name.clone());
        active.description = Set(input.description);
        let updated = active.update(&*self.db_pool).await?;

        self.audit
            .record(
                actor,
                AuditModule::AssetTypes,
                AuditAction::Update,
                Some(id),
                format!("name={}", name),
            )
            .await;
        Ok(updated)
    }

    /// Moves the type to the trash. Refused while live assets still use it.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let in_use = asset::Entity::find_live()
            .filter(asset::Column::AssetTypeId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "asset type '{}' is used by {} asset(s)",
                existing.name, in_use
            )));
        }

        let name = existing.name.clone();
        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&*self.db_pool).await?;

        self.audit
            .record(
                actor,
                AuditModule::AssetTypes,
                AuditAction::Delete,
                Some(id),
                format!("name={}", name),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_asset, setup_db};
    use assert_matches::assert_matches;

    fn input(name: &str) -> AssetTypeInput {
        AssetTypeInput {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn names_are_unique_among_live_types() {
        let db = Arc::new(setup_db().await);
        let svc = AssetTypeService::new(db.clone(), AuditService::new(db.clone()));
        let furniture = svc.create(None, input("Furniture")).await.unwrap();
        assert_matches!(
            svc.create(None, input("Furniture")).await,
            Err(ServiceError::Conflict(_))
        );

        svc.delete(None, furniture.id).await.unwrap();
        svc.create(None, input("Furniture")).await.unwrap();

        let page = svc.list(Some("furn"), 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn delete_refused_while_in_use() {
        let db = Arc::new(setup_db().await);
        let asset = seed_asset(&db, "Desk").await;
        let svc = AssetTypeService::new(db.clone(), AuditService::new(db.clone()));
        assert_matches!(
            svc.delete(None, asset.asset_type_id).await,
            Err(ServiceError::InvalidOperation(_))
        );
    }
}
