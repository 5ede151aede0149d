use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::db::DbPool;
use crate::entities::audit_log::{self, AuditAction, AuditModule};
use crate::errors::ServiceError;
use crate::repositories::Page;

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<i32>,
    pub module: Option<AuditModule>,
    /// Inclusive, compared against the UTC calendar day of `created_at`
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Append-only trail of create, update, delete, restore and purge actions
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Writes one audit entry. Failures are logged and swallowed so the action being
    /// audited never fails because of its trail.
    #[instrument(skip(self, details))]
    pub async fn record(
        &self,
        actor: Option<i32>,
        module: AuditModule,
        action: AuditAction,
        entity_id: Option<i32>,
        details: impl Into<String>,
    ) {
        let entry = audit_log::ActiveModel {
            user_id: Set(actor),
            module: Set(module),
            action: Set(action),
            entity_id: Set(entity_id),
            details: Set(Some(details.into())),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = entry.insert(&*self.db_pool).await {
            warn!(error = %e, %module, %action, ?entity_id, "audit entry not written");
        }
    }

    /// Newest entries first
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<audit_log::Model>, ServiceError> {
        let mut query = audit_log::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(module) = filter.module {
            query = query.filter(audit_log::Column::Module.eq(module));
        }
        if let Some(from) = filter.date_from {
            let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
            query = query.filter(audit_log::Column::CreatedAt.gte(start));
        }
        if let Some(to) = filter.date_to.and_then(|d| d.succ_opt()) {
            let end = Utc.from_utc_datetime(&to.and_time(NaiveTime::MIN));
            query = query.filter(audit_log::Column::CreatedAt.lt(end));
        }

        let paginator = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .paginate(&*self.db_pool, per_page);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    #[tokio::test]
    async fn records_and_filters_entries() {
        let svc = AuditService::new(Arc::new(setup_db().await));
        svc.record(None, AuditModule::Assets, AuditAction::Create, Some(1), "name=Laptop")
            .await;
        svc.record(None, AuditModule::Maintenance, AuditAction::Delete, Some(7), "asset_id=1")
            .await;

        let all = svc.list(&AuditFilter::default(), 1, 10).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].module, AuditModule::Maintenance);

        let only_assets = AuditFilter {
            module: Some(AuditModule::Assets),
            date_from: Some(Utc::now().date_naive()),
            date_to: Some(Utc::now().date_naive()),
            ..Default::default()
        };
        let page = svc.list(&only_assets, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].details.as_deref(), Some("name=Laptop"));
    }

    #[tokio::test]
    async fn unknown_actor_does_not_fail_the_caller() {
        let svc = AuditService::new(Arc::new(setup_db().await));
        svc.record(Some(4242), AuditModule::Users, AuditAction::Update, Some(1), "x")
            .await;
        let page = svc.list(&AuditFilter::default(), 1, 10).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
