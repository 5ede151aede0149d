//! Recurring maintenance schedules.
//!
//! Every live, non-disposed asset should carry a maintenance record whose `next_due_date`
//! is today or later. When the latest due date is missing or already past, one automatic
//! "scheduled" record is staged for the asset. All staged records are written in a single
//! batch inside one transaction: either every one of them lands or none does.

use chrono::{Days, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{ConnectionTrait, DatabaseTransaction, Set, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::maintenance_record::{
    self, MaintenanceStatus, MaintenanceType, AUTO_SCHEDULE_DESCRIPTION, SYSTEM_PERSON,
};
use crate::errors::ServiceError;
use crate::repositories::{AssetRepository, MaintenanceRepository};

/// Days between generating a schedule and its due date, unless configured otherwise
pub const DEFAULT_INTERVAL_DAYS: i64 = 365;

/// Maximum rows per `INSERT` statement; keeps each statement under the bind-parameter
/// limit of SQLite and Postgres.
pub const INSERT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Plain day count, so a span containing Feb 29 ends one calendar day earlier
    pub interval_days: i64,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            interval_days: DEFAULT_INTERVAL_DAYS,
        }
    }
}

impl SchedulePolicy {
    /// Due date for a schedule generated on `today`
    pub fn next_due(&self, today: NaiveDate) -> Option<NaiveDate> {
        u64::try_from(self.interval_days)
            .ok()
            .filter(|days| *days > 0)
            .and_then(|days| today.checked_add_days(Days::new(days)))
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("asset {0} has an invalid id")]
    InvalidAsset(i32),
    #[error("next due date for asset {asset_id} overflows the calendar")]
    DueDateOverflow { asset_id: i32 },
    #[error("due date {due} is not after the maintenance date {today}")]
    DueNotInFuture { due: NaiveDate, today: NaiveDate },
}

/// Whether an asset whose latest schedule is due on `latest_due` needs a new one.
///
/// A schedule due exactly today still counts as current.
pub fn needs_schedule(latest_due: Option<NaiveDate>, today: NaiveDate) -> bool {
    match latest_due {
        None => true,
        Some(due) => due < today,
    }
}

/// Builds the automatic record for `asset_id`, checking it before it is staged
pub fn build_auto_schedule(
    asset_id: i32,
    today: NaiveDate,
    policy: &SchedulePolicy,
) -> Result<maintenance_record::ActiveModel, ScheduleError> {
    if asset_id <= 0 {
        return Err(ScheduleError::InvalidAsset(asset_id));
    }
    let due = policy
        .next_due(today)
        .ok_or(ScheduleError::DueDateOverflow { asset_id })?;
    if due <= today {
        return Err(ScheduleError::DueNotInFuture { due, today });
    }

    // insert_many bypasses before_save, so timestamps are set here.
    let now = Utc::now();
    Ok(maintenance_record::ActiveModel {
        asset_id: Set(asset_id),
        maintenance_date: Set(today),
        maintenance_type: Set(MaintenanceType::Maintenance),
        description: Set(Some(AUTO_SCHEDULE_DESCRIPTION.to_string())),
        vendor: Set(None),
        person_in_charge: Set(Some(SYSTEM_PERSON.to_string())),
        cost: Set(0.0),
        next_due_date: Set(Some(due)),
        status: Set(MaintenanceStatus::Scheduled),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
}

/// Records staged for insertion plus the assets that were passed over
#[derive(Debug, Default)]
pub struct StagedSchedules {
    pub scanned: usize,
    pub records: Vec<maintenance_record::ActiveModel>,
    pub skipped: Vec<i32>,
}

/// Reads every schedulable asset through `db` and stages the missing schedules.
///
/// A failure for one asset skips that asset only; failing to list assets fails the run.
pub async fn stage_schedules<C: ConnectionTrait>(
    db: &C,
    policy: &SchedulePolicy,
    today: NaiveDate,
) -> Result<StagedSchedules, ServiceError> {
    let assets = AssetRepository::list_schedulable(db).await?;
    let mut staged = StagedSchedules {
        scanned: assets.len(),
        ..Default::default()
    };

    for asset in assets {
        let latest = match MaintenanceRepository::find_latest_by_asset(db, asset.id).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(asset_id = asset.id, error = %e, "skipping asset: latest schedule lookup failed");
                staged.skipped.push(asset.id);
                continue;
            }
        };

        let latest_due = latest.and_then(|r| r.next_due_date);
        if !needs_schedule(latest_due, today) {
            continue;
        }

        match build_auto_schedule(asset.id, today, policy) {
            Ok(record) => {
                debug!(asset_id = asset.id, ?latest_due, "staging automatic schedule");
                staged.records.push(record);
            }
            Err(e) => {
                warn!(asset_id = asset.id, error = %e, "skipping asset: invalid automatic schedule");
                staged.skipped.push(asset.id);
            }
        }
    }

    Ok(staged)
}

/// Inserts `records` inside `txn` in chunks of [`INSERT_CHUNK_SIZE`] and commits. On any
/// failure the transaction is rolled back and nothing from the batch is persisted.
pub async fn persist_batch(
    txn: DatabaseTransaction,
    records: Vec<maintenance_record::ActiveModel>,
) -> Result<u64, ServiceError> {
    match MaintenanceRepository::insert_batch(&txn, records, INSERT_CHUNK_SIZE).await {
        Ok(inserted) => {
            txn.commit().await.map_err(ServiceError::db_error)?;
            Ok(inserted)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback of schedule batch failed");
            }
            Err(e)
        }
    }
}

/// What one scheduler pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScheduleOutcome {
    /// Assets examined
    pub scanned: usize,
    /// Schedules written
    pub created: u64,
    /// Assets passed over because of a per-asset failure
    pub skipped: Vec<i32>,
    /// False when the batch was rolled back
    pub committed: bool,
}

/// Runs the recurring schedule generator against the database
#[derive(Clone)]
pub struct SchedulerService {
    db: Arc<DbPool>,
    policy: SchedulePolicy,
}

impl SchedulerService {
    pub fn new(db: Arc<DbPool>, policy: SchedulePolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    /// Ensures every schedulable asset has a current schedule as of `today`.
    ///
    /// Never fails: storage errors roll the batch back and are reported through the
    /// returned outcome and the logs.
    #[instrument(skip(self))]
    pub async fn ensure_schedules(&self, today: NaiveDate) -> ScheduleOutcome {
        counter!("maintenance_scheduler.runs", 1);

        let txn = match self.db.begin().await {
            Ok(txn) => txn,
            Err(e) => {
                warn!(error = %e, "could not open scheduler transaction");
                counter!("maintenance_scheduler.rollbacks", 1);
                return ScheduleOutcome::default();
            }
        };

        let staged = match stage_schedules(&txn, &self.policy, today).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = %e, "scheduler could not read assets");
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "rollback of schedule batch failed");
                }
                counter!("maintenance_scheduler.rollbacks", 1);
                return ScheduleOutcome::default();
            }
        };

        let mut outcome = ScheduleOutcome {
            scanned: staged.scanned,
            skipped: staged.skipped,
            ..Default::default()
        };

        match persist_batch(txn, staged.records).await {
            Ok(created) => {
                outcome.created = created;
                outcome.committed = true;
                if created > 0 {
                    counter!("maintenance_scheduler.created", created);
                    info!(created, scanned = outcome.scanned, "automatic schedules created");
                }
            }
            Err(e) => {
                warn!(error = %e, "schedule batch rolled back");
                counter!("maintenance_scheduler.rollbacks", 1);
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::maintenance_record::Entity as MaintenanceRecord;
    use crate::test_support::{date, insert_record, seed_asset, seed_assets, setup_db};
    use rstest::rstest;
    use sea_orm::{EntityTrait, PaginatorTrait};

    fn service(db: DbPool) -> SchedulerService {
        SchedulerService::new(Arc::new(db), SchedulePolicy::default())
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(date(2024, 5, 9)), true)]
    #[case(Some(date(2024, 5, 10)), false)]
    #[case(Some(date(2024, 5, 11)), false)]
    fn schedule_threshold(#[case] latest_due: Option<NaiveDate>, #[case] expected: bool) {
        assert_eq!(needs_schedule(latest_due, date(2024, 5, 10)), expected);
    }

    #[rstest]
    #[case(date(2023, 1, 10), date(2024, 1, 10))]
    #[case(date(2023, 3, 1), date(2024, 2, 29))]
    #[case(date(2024, 1, 10), date(2025, 1, 9))]
    #[case(date(2024, 3, 1), date(2025, 3, 1))]
    fn default_interval_is_365_days(#[case] today: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(SchedulePolicy::default().next_due(today), Some(expected));
    }

    #[test]
    fn configured_interval_counts_days() {
        let monthly = SchedulePolicy { interval_days: 30 };
        assert_eq!(monthly.next_due(date(2024, 1, 10)), Some(date(2024, 2, 9)));
        assert_eq!(SchedulePolicy { interval_days: -1 }.next_due(date(2024, 1, 10)), None);
    }

    #[test]
    fn auto_schedule_fields() {
        let record = build_auto_schedule(4, date(2023, 1, 10), &SchedulePolicy::default()).unwrap();
        assert_eq!(record.asset_id.clone().unwrap(), 4);
        assert_eq!(record.maintenance_date.clone().unwrap(), date(2023, 1, 10));
        assert_eq!(
            record.maintenance_type.clone().unwrap(),
            MaintenanceType::Maintenance
        );
        assert_eq!(
            record.description.clone().unwrap().as_deref(),
            Some(AUTO_SCHEDULE_DESCRIPTION)
        );
        assert_eq!(
            record.person_in_charge.clone().unwrap().as_deref(),
            Some(SYSTEM_PERSON)
        );
        assert_eq!(record.cost.clone().unwrap(), 0.0);
        assert_eq!(
            record.next_due_date.clone().unwrap(),
            Some(date(2024, 1, 10))
        );
        assert_eq!(record.status.clone().unwrap(), MaintenanceStatus::Scheduled);
    }

    #[test]
    fn invalid_policy_is_rejected_before_staging() {
        let policy = SchedulePolicy { interval_days: 0 };
        assert!(matches!(
            build_auto_schedule(1, date(2024, 1, 10), &policy),
            Err(ScheduleError::DueDateOverflow { asset_id: 1 })
        ));
        assert!(matches!(
            build_auto_schedule(0, date(2024, 1, 10), &SchedulePolicy::default()),
            Err(ScheduleError::InvalidAsset(0))
        ));
    }

    #[tokio::test]
    async fn creates_schedule_for_asset_without_records() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Projector").await;
        let svc = service(db);

        let outcome = svc.ensure_schedules(date(2024, 1, 10)).await;
        assert_eq!(outcome.scanned, 1);
        assert_eq!(outcome.created, 1);
        assert!(outcome.committed);

        let latest = MaintenanceRepository::find_latest_by_asset(&*svc.db, asset.id)
            .await
            .unwrap()
            .unwrap();
        // 2024 is a leap year, so 365 days ends on Jan 9
        assert_eq!(latest.next_due_date, Some(date(2025, 1, 9)));
        assert_eq!(latest.maintenance_date, date(2024, 1, 10));
        assert_eq!(latest.status, MaintenanceStatus::Scheduled);
        assert_eq!(latest.person_in_charge.as_deref(), Some(SYSTEM_PERSON));
    }

    #[tokio::test]
    async fn second_run_on_same_day_is_a_no_op() {
        let db = setup_db().await;
        seed_asset(&db, "Laptop").await;
        let svc = service(db);
        let today = date(2024, 3, 1);

        assert_eq!(svc.ensure_schedules(today).await.created, 1);
        let second = svc.ensure_schedules(today).await;
        assert_eq!(second.created, 0);
        assert!(second.committed);

        let total = MaintenanceRecord::find().count(&*svc.db).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn due_today_is_not_recreated_but_yesterday_is() {
        let db = setup_db().await;
        let today = date(2024, 6, 15);
        let current = seed_asset(&db, "Current").await;
        let expired = seed_asset(&db, "Expired").await;
        insert_record(&db, current.id, date(2023, 6, 15), Some(today), 50.0).await;
        insert_record(&db, expired.id, date(2023, 6, 14), Some(date(2024, 6, 14)), 50.0).await;
        let svc = service(db);

        let outcome = svc.ensure_schedules(today).await;
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.created, 1);

        let current_latest = MaintenanceRepository::find_latest_by_asset(&*svc.db, current.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current_latest.next_due_date, Some(today));

        let expired_latest = MaintenanceRepository::find_latest_by_asset(&*svc.db, expired.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(expired_latest.next_due_date, Some(date(2025, 6, 15)));
    }

    #[tokio::test]
    async fn failing_batch_persists_nothing() {
        let db = setup_db().await;
        let asset = seed_asset(&db, "Valid").await;
        let policy = SchedulePolicy::default();
        let today = date(2024, 1, 10);

        let good = build_auto_schedule(asset.id, today, &policy).unwrap();
        // No asset 9999 exists, so the foreign key rejects the batch.
        let bad = build_auto_schedule(9999, today, &policy).unwrap();

        let txn = db.begin().await.unwrap();
        let result = persist_batch(txn, vec![good, bad]).await;
        assert!(result.is_err());

        let total = MaintenanceRecord::find().count(&db).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn large_fleet_is_scheduled_in_one_run() {
        let db = setup_db().await;
        seed_assets(&db, "Sensor", 3100).await;
        let svc = service(db);

        let outcome = svc.ensure_schedules(date(2024, 1, 10)).await;
        assert_eq!(outcome.scanned, 3100);
        assert!(outcome.committed);
        assert_eq!(outcome.created, 3100);

        let total = MaintenanceRecord::find().count(&*svc.db).await.unwrap();
        assert_eq!(total, 3100);
    }

    #[tokio::test]
    async fn failure_in_a_later_chunk_rolls_back_earlier_chunks() {
        let db = setup_db().await;
        seed_assets(&db, "Camera", INSERT_CHUNK_SIZE + 20).await;
        let policy = SchedulePolicy::default();
        let today = date(2024, 1, 10);

        let assets = AssetRepository::list_schedulable(&db).await.unwrap();
        let mut records: Vec<_> = assets
            .iter()
            .map(|a| build_auto_schedule(a.id, today, &policy).unwrap())
            .collect();
        // lands in the second chunk; the foreign key rejects it
        records.push(build_auto_schedule(999_999, today, &policy).unwrap());

        let txn = db.begin().await.unwrap();
        assert!(persist_batch(txn, records).await.is_err());

        let total = MaintenanceRecord::find().count(&db).await.unwrap();
        assert_eq!(total, 0);
    }
}
