use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use super::{search_condition, Page};
use crate::entities::maintenance_record::{
    ActiveModel as MaintenanceActiveModel, Column, Entity as MaintenanceRecord, Model,
};
use crate::entities::SoftDeletable;
use crate::errors::ServiceError;

/// Constraint on `next_due_date`. Every variant excludes records without a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueFilter {
    /// `next_due_date < date`
    Before(NaiveDate),
    /// `next_due_date <= date`
    OnOrBefore(NaiveDate),
    /// `start <= next_due_date <= end`
    Between(NaiveDate, NaiveDate),
}

/// Filters accepted by maintenance queries; soft-deleted rows are always excluded
#[derive(Debug, Clone, Default)]
pub struct MaintenanceFilter {
    pub asset_id: Option<i32>,
    /// Matched against description, vendor and person in charge
    pub search: Option<String>,
    /// Inclusive bounds on `maintenance_date`
    pub maintenance_between: Option<(NaiveDate, NaiveDate)>,
    pub due: Option<DueFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaintenanceOrder {
    /// Newest maintenance first
    #[default]
    MaintenanceDateDesc,
    /// Soonest due first
    NextDueAsc,
}

/// Store for maintenance records.
///
/// Every function is generic over the connection so the scheduler can run it inside
/// its transaction.
pub struct MaintenanceRepository;

impl MaintenanceRepository {
    fn select(filter: &MaintenanceFilter, order: MaintenanceOrder) -> Select<MaintenanceRecord> {
        let mut query = MaintenanceRecord::find_live();

        if let Some(asset_id) = filter.asset_id {
            query = query.filter(Column::AssetId.eq(asset_id));
        }
        if let Some(cond) = filter.search.as_deref().and_then(|term| {
            search_condition(
                &[Column::Description, Column::Vendor, Column::PersonInCharge],
                term,
            )
        }) {
            query = query.filter(cond);
        }
        if let Some((start, end)) = filter.maintenance_between {
            query = query
                .filter(Column::MaintenanceDate.gte(start))
                .filter(Column::MaintenanceDate.lte(end));
        }
        query = match filter.due {
            None => query,
            Some(DueFilter::Before(date)) => query
                .filter(Column::NextDueDate.is_not_null())
                .filter(Column::NextDueDate.lt(date)),
            Some(DueFilter::OnOrBefore(date)) => query
                .filter(Column::NextDueDate.is_not_null())
                .filter(Column::NextDueDate.lte(date)),
            Some(DueFilter::Between(start, end)) => query
                .filter(Column::NextDueDate.is_not_null())
                .filter(Column::NextDueDate.gte(start))
                .filter(Column::NextDueDate.lte(end)),
        };

        match order {
            MaintenanceOrder::MaintenanceDateDesc => query
                .order_by_desc(Column::MaintenanceDate)
                .order_by_desc(Column::Id),
            MaintenanceOrder::NextDueAsc => query
                .order_by_asc(Column::NextDueDate)
                .order_by_asc(Column::Id),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<Model>, ServiceError> {
        MaintenanceRecord::find_live()
            .filter(Column::Id.eq(id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Record with the greatest `next_due_date` for the asset, ignoring undated records
    pub async fn find_latest_by_asset<C: ConnectionTrait>(
        db: &C,
        asset_id: i32,
    ) -> Result<Option<Model>, ServiceError> {
        MaintenanceRecord::find_live()
            .filter(Column::AssetId.eq(asset_id))
            .filter(Column::NextDueDate.is_not_null())
            .order_by_desc(Column::NextDueDate)
            .order_by_desc(Column::Id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        record: MaintenanceActiveModel,
    ) -> Result<Model, ServiceError> {
        record.insert(db).await.map_err(ServiceError::db_error)
    }

    /// Inserts `records` with one multi-row statement per `chunk_size` rows and returns how
    /// many were written. Run it on a transaction to make the batch all-or-nothing.
    pub async fn insert_batch<C: ConnectionTrait>(
        db: &C,
        records: Vec<MaintenanceActiveModel>,
        chunk_size: usize,
    ) -> Result<u64, ServiceError> {
        let mut written = 0u64;
        for chunk in records.chunks(chunk_size.max(1)) {
            MaintenanceRecord::insert_many(chunk.to_vec())
                .exec(db)
                .await
                .map_err(ServiceError::db_error)?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    pub async fn query<C: ConnectionTrait>(
        db: &C,
        filter: &MaintenanceFilter,
        order: MaintenanceOrder,
        limit: Option<u64>,
    ) -> Result<Vec<Model>, ServiceError> {
        Self::select(filter, order)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count<C: ConnectionTrait>(
        db: &C,
        filter: &MaintenanceFilter,
    ) -> Result<u64, ServiceError> {
        Self::select(filter, MaintenanceOrder::default())
            .count(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// `page` is 1-based
    pub async fn paginate<C: ConnectionTrait>(
        db: &C,
        filter: &MaintenanceFilter,
        order: MaintenanceOrder,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Model>, ServiceError> {
        let paginator = Self::select(filter, order).paginate(db, per_page);
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

    /// Records whose `maintenance_date` falls in `[start, end]`
    pub async fn find_in_range<C: ConnectionTrait>(
        db: &C,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Model>, ServiceError> {
        let filter = MaintenanceFilter {
            maintenance_between: Some((start, end)),
            ..Default::default()
        };
        Self::query(db, &filter, MaintenanceOrder::MaintenanceDateDesc, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::maintenance_record::{MaintenanceStatus, MaintenanceType};
    use crate::test_support::{date, insert_record, new_record, seed_asset, setup_db};

    #[tokio::test]
    async fn latest_by_asset_ignores_records_without_due_date() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Laptop").await;
        insert_record(&db, asset.id, date(2024, 1, 1), Some(date(2024, 6, 1)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 2, 1), Some(date(2025, 2, 1)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 3, 1), None, 0.0).await;

        let latest = MaintenanceRepository::find_latest_by_asset(&db, asset.id)
            .await
            .unwrap()
            .expect("latest record");
        assert_eq!(latest.next_due_date, Some(date(2025, 2, 1)));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_text_columns() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Printer").await;
        let mut rec = new_record(asset.id, date(2024, 1, 5), None, 10.0);
        rec.vendor = sea_orm::Set(Some("ACME Repairs".into()));
        MaintenanceRepository::insert(&db, rec).await.unwrap();
        insert_record(&db, asset.id, date(2024, 1, 6), None, 10.0).await;

        let filter = MaintenanceFilter {
            search: Some("acme".into()),
            ..Default::default()
        };
        let rows = MaintenanceRepository::query(&db, &filter, MaintenanceOrder::default(), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor.as_deref(), Some("ACME Repairs"));
    }

    #[tokio::test]
    async fn due_filters_and_pagination() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Server").await;
        let today = date(2024, 5, 10);
        insert_record(&db, asset.id, date(2024, 1, 1), Some(date(2024, 5, 9)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 1, 2), Some(date(2024, 5, 10)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 1, 3), Some(date(2024, 6, 9)), 0.0).await;
        insert_record(&db, asset.id, date(2024, 1, 4), Some(date(2024, 6, 10)), 0.0).await;

        let overdue = MaintenanceFilter {
            due: Some(DueFilter::Before(today)),
            ..Default::default()
        };
        assert_eq!(MaintenanceRepository::count(&db, &overdue).await.unwrap(), 1);

        let soon = MaintenanceFilter {
            due: Some(DueFilter::Between(today, date(2024, 6, 9))),
            ..Default::default()
        };
        assert_eq!(MaintenanceRepository::count(&db, &soon).await.unwrap(), 2);

        let page = MaintenanceRepository::paginate(
            &db,
            &MaintenanceFilter::default(),
            MaintenanceOrder::MaintenanceDateDesc,
            2,
            3,
        )
        .await
        .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].maintenance_date, date(2024, 1, 1));
    }

    #[tokio::test]
    async fn insert_batch_of_nothing_is_a_no_op() {
        let db = setup_db().await;
        assert_eq!(
            MaintenanceRepository::insert_batch(&db, Vec::new(), 500)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn insert_batch_splits_rows_across_statements() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Router").await;
        let records = (1..=7)
            .map(|day| new_record(asset.id, date(2024, 1, day), None, 1.0))
            .collect();

        let written = MaintenanceRepository::insert_batch(&db, records, 3)
            .await
            .unwrap();
        assert_eq!(written, 7);
        assert_eq!(MaintenanceRecord::find().count(&db).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn range_query_is_inclusive() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Switch").await;
        insert_record(&db, asset.id, date(2024, 1, 1), None, 5.0).await;
        insert_record(&db, asset.id, date(2024, 1, 31), None, 5.0).await;
        insert_record(&db, asset.id, date(2024, 2, 1), None, 5.0).await;

        let rows = MaintenanceRepository::find_in_range(&db, date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| r.maintenance_type == MaintenanceType::Repair
                && r.status == MaintenanceStatus::Completed));
    }
}
