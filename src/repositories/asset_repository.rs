use sea_orm::{ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, Select};

use super::{search_condition, Page};
use crate::entities::asset::{AssetStatus, Column, Entity as Asset, Model};
use crate::entities::SoftDeletable;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// Matched against name, device code and user text
    pub search: Option<String>,
    pub asset_type_id: Option<i32>,
    pub status: Option<AssetStatus>,
}

pub struct AssetRepository;

impl AssetRepository {
    fn select(filter: &AssetFilter) -> Select<Asset> {
        let mut query = Asset::find_live();
        if let Some(cond) = filter.search.as_deref().and_then(|term| {
            search_condition(&[Column::Name, Column::DeviceCode, Column::UserText], term)
        }) {
            query = query.filter(cond);
        }
        if let Some(type_id) = filter.asset_type_id {
            query = query.filter(Column::AssetTypeId.eq(type_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }
        query.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id)
    }

    /// All live assets, oldest first
    pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, ServiceError> {
        Asset::find_live()
            .order_by_asc(Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Live assets that still take part in maintenance planning
    pub async fn list_schedulable<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<Model>, ServiceError> {
        Asset::find_live()
            .filter(Column::Status.ne(AssetStatus::Disposed))
            .order_by_asc(Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<Model>, ServiceError> {
        Asset::find_live()
            .filter(Column::Id.eq(id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Live asset with exactly this name, optionally ignoring one id
    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
        exclude_id: Option<i32>,
    ) -> Result<Option<Model>, ServiceError> {
        let mut query = Asset::find_live().filter(Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(Column::Id.ne(id));
        }
        query.one(db).await.map_err(ServiceError::db_error)
    }

    pub async fn count<C: ConnectionTrait>(
        db: &C,
        filter: &AssetFilter,
    ) -> Result<u64, ServiceError> {
        Self::select(filter)
            .count(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn paginate<C: ConnectionTrait>(
        db: &C,
        filter: &AssetFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Model>, ServiceError> {
        let paginator = Self::select(filter).paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }
}
