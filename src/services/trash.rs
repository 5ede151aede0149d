//! Soft-deleted rows across modules: listing, restoring and purging.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, PrimaryKeyTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::asset::AssetStatus;
use crate::entities::audit_log::{AuditAction, AuditModule};
use crate::entities::{asset, asset_type, maintenance_record, user, SoftDeletable};
use crate::errors::ServiceError;
use crate::services::audit::AuditService;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrashModule {
    Asset,
    AssetType,
    User,
    Maintenance,
    #[default]
    All,
}

impl TrashModule {
    const CONCRETE: [TrashModule; 4] = [
        TrashModule::Asset,
        TrashModule::AssetType,
        TrashModule::User,
        TrashModule::Maintenance,
    ];
}

/// One soft-deleted row
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrashItem {
    pub module: TrashModule,
    pub id: i32,
    pub label: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrashTarget {
    pub module: TrashModule,
    pub id: i32,
}

async fn find_trashed<E>(db: &DbPool, id: i32, label: &str) -> Result<E::Model, ServiceError>
where
    E: SoftDeletable,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id)
        .filter(E::deleted_at_column().is_not_null())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} is not in the trash", label, id)))
}

#[derive(Clone)]
pub struct TrashService {
    db_pool: Arc<DbPool>,
    audit: AuditService,
}

impl TrashService {
    pub fn new(db_pool: Arc<DbPool>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    /// Trashed rows of `module`, most recently deleted first
    #[instrument(skip(self))]
    pub async fn list(&self, module: TrashModule) -> Result<Vec<TrashItem>, ServiceError> {
        let mut items = Vec::new();
        let modules: &[TrashModule] = match module {
            TrashModule::All => &TrashModule::CONCRETE,
            ref one => std::slice::from_ref(one),
        };
        for module in modules {
            items.extend(self.list_one(*module).await?);
        }
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn list_one(&self, module: TrashModule) -> Result<Vec<TrashItem>, ServiceError> {
        let db = &*self.db_pool;
        let items = match module {
            TrashModule::Asset => asset::Entity::find_trashed()
                .order_by_desc(asset::Column::DeletedAt)
                .all(db)
                .await?
                .into_iter()
                .filter_map(|m| trash_item(module, m.id, m.name, m.deleted_at))
                .collect(),
            TrashModule::AssetType => asset_type::Entity::find_trashed()
                .order_by_desc(asset_type::Column::DeletedAt)
                .all(db)
                .await?
                .into_iter()
                .filter_map(|m| trash_item(module, m.id, m.name, m.deleted_at))
                .collect(),
            TrashModule::User => user::Entity::find_trashed()
                .order_by_desc(user::Column::DeletedAt)
                .all(db)
                .await?
                .into_iter()
                .filter_map(|m| trash_item(module, m.id, m.username, m.deleted_at))
                .collect(),
            TrashModule::Maintenance => maintenance_record::Entity::find_trashed()
                .order_by_desc(maintenance_record::Column::DeletedAt)
                .all(db)
                .await?
                .into_iter()
                .filter_map(|m| {
                    let label = format!(
                        "{} on {} (asset {})",
                        m.maintenance_type, m.maintenance_date, m.asset_id
                    );
                    trash_item(module, m.id, label, m.deleted_at)
                })
                .collect(),
            TrashModule::All => Vec::new(),
        };
        Ok(items)
    }

    /// Brings a trashed row back. A restored asset becomes active again.
    #[instrument(skip(self))]
    pub async fn restore(
        &self,
        actor: Option<i32>,
        target: TrashTarget,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let id = target.id;
        match target.module {
            TrashModule::Asset => {
                let row = find_trashed::<asset::Entity>(db, id, "Asset").await?;
                let taken = asset::Entity::find_live()
                    .filter(asset::Column::Name.eq(row.name.as_str()))
                    .count(db)
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "a live asset is already named '{}'",
                        row.name
                    )));
                }
                let type_live = asset_type::Entity::find_live()
                    .filter(asset_type::Column::Id.eq(row.asset_type_id))
                    .count(db)
                    .await?;
                if type_live == 0 {
                    return Err(ServiceError::InvalidOperation(format!(
                        "restore asset type {} first",
                        row.asset_type_id
                    )));
                }
                let mut active = row.into_active_model();
                active.deleted_at = Set(None);
                active.status = Set(AssetStatus::Active);
                active.update(db).await?;
            }
            TrashModule::AssetType => {
                let row = find_trashed::<asset_type::Entity>(db, id, "Asset type").await?;
                let taken = asset_type::Entity::find_live()
                    .filter(asset_type::Column::Name.eq(row.name.as_str()))
                    .count(db)
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "a live asset type is already named '{}'",
                        row.name
                    )));
                }
                let mut active = row.into_active_model();
                active.deleted_at = Set(None);
                active.update(db).await?;
            }
            TrashModule::User => {
                let row = find_trashed::<user::Entity>(db, id, "User").await?;
                let mut active = row.into_active_model();
                active.deleted_at = Set(None);
                active.update(db).await?;
            }
            TrashModule::Maintenance => {
                let row =
                    find_trashed::<maintenance_record::Entity>(db, id, "Maintenance record")
                        .await?;
                let asset_live = asset::Entity::find_live()
                    .filter(asset::Column::Id.eq(row.asset_id))
                    .count(db)
                    .await?;
                if asset_live == 0 {
                    return Err(ServiceError::InvalidOperation(format!(
                        "restore asset {} first",
                        row.asset_id
                    )));
                }
                let mut active = row.into_active_model();
                active.deleted_at = Set(None);
                active.update(db).await?;
            }
            TrashModule::All => {
                return Err(ServiceError::BadRequest(
                    "restore needs a single module".to_string(),
                ))
            }
        }

        info!(module = %target.module, id, "restored from trash");
        self.audit
            .record(
                actor,
                AuditModule::Trash,
                AuditAction::Restore,
                Some(id),
                format!("module={}", target.module),
            )
            .await;
        Ok(())
    }

    /// Permanently deletes a trashed row. Live rows cannot be purged.
    #[instrument(skip(self))]
    pub async fn purge(&self, actor: Option<i32>, target: TrashTarget) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let id = target.id;
        match target.module {
            TrashModule::Asset => {
                find_trashed::<asset::Entity>(db, id, "Asset").await?;
                asset::Entity::delete_by_id(id).exec(db).await?;
            }
            TrashModule::AssetType => {
                find_trashed::<asset_type::Entity>(db, id, "Asset type").await?;
                let referenced = asset::Entity::find()
                    .filter(asset::Column::AssetTypeId.eq(id))
                    .count(db)
                    .await?;
                if referenced > 0 {
                    return Err(ServiceError::InvalidOperation(format!(
                        "asset type {} is still referenced by {} asset(s)",
                        id, referenced
                    )));
                }
                asset_type::Entity::delete_by_id(id).exec(db).await?;
            }
            TrashModule::User => {
                find_trashed::<user::Entity>(db, id, "User").await?;
                user::Entity::delete_by_id(id).exec(db).await?;
            }
            TrashModule::Maintenance => {
                find_trashed::<maintenance_record::Entity>(db, id, "Maintenance record").await?;
                maintenance_record::Entity::delete_by_id(id).exec(db).await?;
            }
            TrashModule::All => {
                return Err(ServiceError::BadRequest(
                    "purge needs a single module".to_string(),
                ))
            }
        }

        info!(module = %target.module, id, "purged from trash");
        self.audit
            .record(
                actor,
                AuditModule::Trash,
                AuditAction::Purge,
                Some(id),
                format!("module={}", target.module),
            )
            .await;
        Ok(())
    }
}

fn trash_item(
    module: TrashModule,
    id: i32,
    label: String,
    deleted_at: Option<DateTime<Utc>>,
) -> Option<TrashItem> {
    deleted_at.map(|deleted_at| TrashItem {
        module,
        id,
        label,
        deleted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::assets::{AssetInput, AssetService};
    use crate::services::maintenance::MaintenanceService;
    use crate::test_support::{date, insert_record, seed_asset_type, setup_db};
    use assert_matches::assert_matches;
    use std::str::FromStr;

    fn asset_input(name: &str, asset_type_id: i32) -> AssetInput {
        AssetInput {
            name: name.to_string(),
            price: 10.0,
            quantity: 1,
            status: AssetStatus::Active,
            asset_type_id,
            purchase_date: None,
            device_code: None,
            condition_label: None,
            user_id: None,
            user_text: None,
            notes: None,
            usage_months: None,
            condition_percent: None,
        }
    }

    #[test]
    fn module_names_parse() {
        assert_eq!(TrashModule::from_str("asset_type").unwrap(), TrashModule::AssetType);
        assert_eq!(TrashModule::from_str("all").unwrap(), TrashModule::All);
        assert!(TrashModule::from_str("orders").is_err());
    }

    #[tokio::test]
    async fn restore_brings_asset_back_active() {
        let db = Arc::new(setup_db().await);
        let audit = AuditService::new(db.clone());
        let kind = seed_asset_type(&db, "Vehicle").await;
        let assets = AssetService::new(db.clone(), audit.clone());
        let trash = TrashService::new(db.clone(), audit);

        let van = assets.create(None, asset_input("Van", kind.id)).await.unwrap();
        assets.delete(None, van.id).await.unwrap();

        let listed = trash.list(TrashModule::All).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].module, TrashModule::Asset);
        assert_eq!(listed[0].label, "Van");

        trash
            .restore(None, TrashTarget { module: TrashModule::Asset, id: van.id })
            .await
            .unwrap();
        let back = assets.get(van.id).await.unwrap();
        assert_eq!(back.status, AssetStatus::Active);
        assert!(trash.list(TrashModule::Asset).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_only_touches_trashed_rows() {
        let db = Arc::new(setup_db().await);
        let audit = AuditService::new(db.clone());
        let kind = seed_asset_type(&db, "Tool").await;
        let assets = AssetService::new(db.clone(), audit.clone());
        let maintenance = MaintenanceService::new(db.clone(), audit.clone());
        let trash = TrashService::new(db.clone(), audit);

        let drill = assets.create(None, asset_input("Drill", kind.id)).await.unwrap();
        let record = insert_record(&db, drill.id, date(2024, 1, 1), None, 5.0).await;

        assert_matches!(
            trash
                .purge(None, TrashTarget { module: TrashModule::Maintenance, id: record.id })
                .await,
            Err(ServiceError::NotFound(_))
        );

        maintenance.delete(None, record.id).await.unwrap();
        trash
            .purge(None, TrashTarget { module: TrashModule::Maintenance, id: record.id })
            .await
            .unwrap();
        assert!(maintenance_record::Entity::find_by_id(record.id)
            .one(&*db)
            .await
            .unwrap()
            .is_none());

        assert_matches!(
            trash
                .purge(None, TrashTarget { module: TrashModule::All, id: 1 })
                .await,
            Err(ServiceError::BadRequest(_))
        );
    }

    #[tokio::test]
    async fn maintenance_restore_needs_live_asset() {
        let db = Arc::new(setup_db().await);
        let audit = AuditService::new(db.clone());
        let kind = seed_asset_type(&db, "Lift").await;
        let assets = AssetService::new(db.clone(), audit.clone());
        let maintenance = MaintenanceService::new(db.clone(), audit.clone());
        let trash = TrashService::new(db.clone(), audit);

        let lift = assets.create(None, asset_input("Lift A", kind.id)).await.unwrap();
        let record = insert_record(&db, lift.id, date(2024, 1, 1), None, 5.0).await;
        maintenance.delete(None, record.id).await.unwrap();
        assets.delete(None, lift.id).await.unwrap();

        let target = TrashTarget { module: TrashModule::Maintenance, id: record.id };
        assert_matches!(
            trash.restore(None, target.clone()).await,
            Err(ServiceError::InvalidOperation(_))
        );
        trash
            .restore(None, TrashTarget { module: TrashModule::Asset, id: lift.id })
            .await
            .unwrap();
        trash.restore(None, target).await.unwrap();
    }
}
