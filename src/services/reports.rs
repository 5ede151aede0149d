use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::maintenance_record::{MaintenanceStatus, Model as MaintenanceRecord};
use crate::errors::ServiceError;
use crate::repositories::{MaintenanceFilter, MaintenanceOrder, MaintenanceRepository};
use crate::services::due::DueService;

/// First and last day of `year`
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// First and last day of `month` in `year`
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))?;
    Some((first, last))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct MonthlyCost {
    pub month: u32,
    pub total_cost: f64,
}

/// Cost per month for one year. Months without records are left out.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyCostReport {
    pub year: i32,
    pub months: Vec<MonthlyCost>,
    pub total_cost: f64,
}

impl MonthlyCostReport {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            months: Vec::new(),
            total_cost: 0.0,
        }
    }

    /// Groups `records` by the month of their maintenance date; records outside `year`
    /// are ignored
    pub fn from_records(year: i32, records: &[MaintenanceRecord]) -> Self {
        let mut by_month: BTreeMap<u32, f64> = BTreeMap::new();
        for record in records.iter().filter(|r| r.maintenance_date.year() == year) {
            *by_month.entry(record.maintenance_date.month()).or_insert(0.0) += record.cost;
        }
        let months: Vec<MonthlyCost> = by_month
            .into_iter()
            .map(|(month, total_cost)| MonthlyCost { month, total_cost })
            .collect();
        let total_cost = months.iter().map(|m| m.total_cost).sum();
        Self {
            year,
            months,
            total_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub scheduled: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    fn bump(&mut self, status: MaintenanceStatus) {
        match status {
            MaintenanceStatus::Scheduled => self.scheduled += 1,
            MaintenanceStatus::InProgress => self.in_progress += 1,
            MaintenanceStatus::Completed => self.completed += 1,
            MaintenanceStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Count and cost statistics over an inclusive date range
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodKpis {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub record_count: u64,
    pub total_cost: f64,
    pub status_counts: StatusCounts,
    /// Records with a cost above zero
    pub records_with_cost: u64,
    /// Largest positive cost, 0 when none
    pub max_cost: f64,
    /// Smallest positive cost, 0 when none
    pub min_cost: f64,
    /// Percentage of completed records, one decimal
    pub completion_rate: f64,
    /// Total cost divided by record count, rounded to a whole number
    pub average_cost: f64,
}

impl PeriodKpis {
    pub fn empty(start: NaiveDate, end: NaiveDate) -> Self {
        Self::from_records(start, end, &[])
    }

    pub fn from_records(start: NaiveDate, end: NaiveDate, records: &[MaintenanceRecord]) -> Self {
        let mut status_counts = StatusCounts::default();
        let mut total_cost = 0.0;
        let mut positive: Vec<f64> = Vec::new();

        for record in records {
            status_counts.bump(record.status);
            total_cost += record.cost;
            if record.cost > 0.0 {
                positive.push(record.cost);
            }
        }

        let record_count = records.len() as u64;
        let max_cost = positive.iter().copied().fold(0.0, f64::max);
        let min_cost = positive.iter().copied().reduce(f64::min).unwrap_or(0.0);
        let (completion_rate, average_cost) = if record_count == 0 {
            (0.0, 0.0)
        } else {
            (
                round_to(status_counts.completed as f64 * 100.0 / record_count as f64, 1),
                round_to(total_cost / record_count as f64, 0),
            )
        };

        Self {
            start,
            end,
            record_count,
            total_cost,
            status_counts,
            records_with_cost: positive.len() as u64,
            max_cost,
            min_cost,
            completion_rate,
            average_cost,
        }
    }
}

/// Everything the maintenance dashboard displays
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub year: PeriodKpis,
    pub month: PeriodKpis,
    /// Every overdue record, not only the listed ones
    pub overdue_count: u64,
    pub due_soon_count: u64,
    #[schema(value_type = Vec<crate::entities::maintenance_record::Model>)]
    pub overdue_records: Vec<MaintenanceRecord>,
    #[schema(value_type = Vec<crate::entities::maintenance_record::Model>)]
    pub recent: Vec<MaintenanceRecord>,
    #[schema(value_type = Vec<crate::entities::maintenance_record::Model>)]
    pub upcoming: Vec<MaintenanceRecord>,
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardLimits {
    pub window_days: i64,
    pub recent: u64,
    pub overdue: u64,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self {
            window_days: 30,
            recent: 8,
            overdue: 10,
        }
    }
}

/// Cost and status aggregation over maintenance records
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Only an out-of-range year is an error; a failed query yields an empty report.
    #[instrument(skip(self))]
    pub async fn monthly_cost_report(&self, year: i32) -> Result<MonthlyCostReport, ServiceError> {
        let (start, end) = year_bounds(year)
            .ok_or_else(|| ServiceError::InvalidInput(format!("year {} is out of range", year)))?;
        let report = match MaintenanceRepository::find_in_range(&*self.db_pool, start, end).await {
            Ok(records) => MonthlyCostReport::from_records(year, &records),
            Err(e) => {
                warn!(year, error = %e, "cost report unavailable");
                MonthlyCostReport::empty(year)
            }
        };
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn period_kpis(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodKpis, ServiceError> {
        if end < start {
            return Err(ServiceError::InvalidInput(format!(
                "period end {} precedes start {}",
                end, start
            )));
        }
        let records = MaintenanceRepository::find_in_range(&*self.db_pool, start, end).await?;
        Ok(PeriodKpis::from_records(start, end, &records))
    }

    /// Builds the dashboard for `today`. Each section degrades to zero or empty when its
    /// query fails.
    #[instrument(skip(self, due))]
    pub async fn dashboard(
        &self,
        due: &DueService,
        today: NaiveDate,
        limits: DashboardLimits,
    ) -> Dashboard {
        let (year_start, year_end) =
            year_bounds(today.year()).unwrap_or((today, today));
        let (month_start, month_end) =
            month_bounds(today.year(), today.month()).unwrap_or((today, today));

        let year = self
            .period_kpis(year_start, year_end)
            .await
            .unwrap_or_else(|e| degraded("year kpis", e, PeriodKpis::empty(year_start, year_end)));
        let month = self
            .period_kpis(month_start, month_end)
            .await
            .unwrap_or_else(|e| {
                degraded("month kpis", e, PeriodKpis::empty(month_start, month_end))
            });

        let overdue_count = due
            .count_overdue(today)
            .await
            .unwrap_or_else(|e| degraded("overdue count", e, 0));
        let due_soon_count = due
            .count_due_soon(today, limits.window_days)
            .await
            .unwrap_or_else(|e| degraded("due soon count", e, 0));
        let overdue_records = due
            .list_overdue(today, limits.overdue)
            .await
            .unwrap_or_else(|e| degraded("overdue list", e, Vec::new()));
        let upcoming = due
            .list_upcoming(today, limits.window_days)
            .await
            .unwrap_or_else(|e| degraded("upcoming list", e, Vec::new()));
        let recent = MaintenanceRepository::query(
            &*self.db_pool,
            &MaintenanceFilter::default(),
            MaintenanceOrder::MaintenanceDateDesc,
            Some(limits.recent),
        )
        .await
        .unwrap_or_else(|e| degraded("recent list", e, Vec::new()));

        Dashboard {
            today,
            year,
            month,
            overdue_count,
            due_soon_count,
            overdue_records,
            recent,
            upcoming,
        }
    }
}

fn degraded<T>(section: &str, error: ServiceError, fallback: T) -> T {
    warn!(section, error = %error, "dashboard section unavailable");
    fallback
}
