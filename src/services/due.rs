use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::maintenance_record::Model as MaintenanceRecord;
use crate::errors::ServiceError;
use crate::repositories::{DueFilter, MaintenanceFilter, MaintenanceOrder, MaintenanceRepository};

/// Where a record's `next_due_date` sits relative to today and the lookahead window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Overdue,
    DueSoon,
    /// Due beyond the window
    Upcoming,
    Unscheduled,
}

/// Last day covered by a window of `window_days` starting today, inclusive
pub fn window_end(today: NaiveDate, window_days: i64) -> NaiveDate {
    today
        .checked_add_days(Days::new(window_days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX)
}

pub fn classify(next_due: Option<NaiveDate>, today: NaiveDate, window_days: i64) -> DueStatus {
    match next_due {
        None => DueStatus::Unscheduled,
        Some(due) if due < today => DueStatus::Overdue,
        Some(due) if due <= window_end(today, window_days) => DueStatus::DueSoon,
        Some(_) => DueStatus::Upcoming,
    }
}

/// Overdue and due-soon counts over an already fetched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DueBreakdown {
    pub overdue: u64,
    pub due_soon: u64,
}

/// Splits a batch by comparing each due date with today only: anything before today is
/// overdue, the rest is due soon. Records without a due date are ignored.
pub fn classify_batch(records: &[MaintenanceRecord], today: NaiveDate) -> DueBreakdown {
    records
        .iter()
        .filter_map(|r| r.next_due_date)
        .fold(DueBreakdown::default(), |mut acc, due| {
            if due < today {
                acc.overdue += 1;
            } else {
                acc.due_soon += 1;
            }
            acc
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Info,
}

/// Banner shown to the user about maintenance that needs attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub count: u64,
    pub message: String,
}

/// Overdue work wins over due-soon work; nothing to report yields no notice.
pub fn notice_for(breakdown: DueBreakdown, window_days: i64) -> Option<Notice> {
    if breakdown.overdue > 0 {
        Some(Notice {
            level: NoticeLevel::Warning,
            count: breakdown.overdue,
            message: format!(
                "{} maintenance item(s) are overdue. Please handle them promptly.",
                breakdown.overdue
            ),
        })
    } else if breakdown.due_soon > 0 {
        Some(Notice {
            level: NoticeLevel::Info,
            count: breakdown.due_soon,
            message: format!(
                "{} maintenance item(s) are due within {} days.",
                breakdown.due_soon, window_days
            ),
        })
    } else {
        None
    }
}

/// Due-date queries over live maintenance records
#[derive(Clone)]
pub struct DueService {
    db: Arc<DbPool>,
}

impl DueService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Records due on or before `today + window_days` (overdue included), soonest first,
    /// capped at `limit`
    #[instrument(skip(self))]
    pub async fn list_due(
        &self,
        today: NaiveDate,
        window_days: i64,
        limit: u64,
    ) -> Result<Vec<MaintenanceRecord>, ServiceError> {
        let filter = MaintenanceFilter {
            due: Some(DueFilter::OnOrBefore(window_end(today, window_days))),
            ..Default::default()
        };
        MaintenanceRepository::query(&*self.db, &filter, MaintenanceOrder::NextDueAsc, Some(limit))
            .await
    }

    /// Global count of records due strictly before today
    #[instrument(skip(self))]
    pub async fn count_overdue(&self, today: NaiveDate) -> Result<u64, ServiceError> {
        let filter = MaintenanceFilter {
            due: Some(DueFilter::Before(today)),
            ..Default::default()
        };
        MaintenanceRepository::count(&*self.db, &filter).await
    }

    /// Global count of records due in `[today, today + window_days]`
    #[instrument(skip(self))]
    pub async fn count_due_soon(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<u64, ServiceError> {
        let filter = MaintenanceFilter {
            due: Some(DueFilter::Between(today, window_end(today, window_days))),
            ..Default::default()
        };
        MaintenanceRepository::count(&*self.db, &filter).await
    }

    /// Overdue records, most overdue first
    #[instrument(skip(self))]
    pub async fn list_overdue(
        &self,
        today: NaiveDate,
        limit: u64,
    ) -> Result<Vec<MaintenanceRecord>, ServiceError> {
        let filter = MaintenanceFilter {
            due: Some(DueFilter::Before(today)),
            ..Default::default()
        };
        MaintenanceRepository::query(&*self.db, &filter, MaintenanceOrder::NextDueAsc, Some(limit))
            .await
    }

    /// Every record due within the window, soonest first
    #[instrument(skip(self))]
    pub async fn list_upcoming(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<MaintenanceRecord>, ServiceError> {
        let filter = MaintenanceFilter {
            due: Some(DueFilter::Between(today, window_end(today, window_days))),
            ..Default::default()
        };
        MaintenanceRepository::query(&*self.db, &filter, MaintenanceOrder::NextDueAsc, None).await
    }
}
