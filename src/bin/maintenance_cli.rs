use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use asset_maintenance_api::{
    auth,
    config::{self, AppConfig},
    db::{self, DbPool},
    services::{
        due::DueService,
        reports::{Dashboard, DashboardLimits, MonthlyCostReport, ReportService},
        scheduler::{ScheduleOutcome, SchedulerService},
        today_utc,
    },
};

#[derive(Parser)]
#[command(
    name = "maintenance-cli",
    about = "Operational commands for the asset maintenance backend",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Seed default roles and the administrator account
    Bootstrap,
    /// Generate due follow-up schedules
    Schedule(ScheduleArgs),
    /// Monthly maintenance cost for a year
    Report(ReportArgs),
    /// Dashboard KPIs and due work
    Dashboard(DateArgs),
}

#[derive(Args)]
struct ScheduleArgs {
    #[command(flatten)]
    date: DateArgs,
}

#[derive(Args)]
struct DateArgs {
    #[arg(long, help = "Evaluate as of this date (YYYY-MM-DD); defaults to today in UTC")]
    today: Option<NaiveDate>,
}

impl DateArgs {
    fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(today_utc)
    }
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, help = "Calendar year; defaults to the current year")]
    year: Option<i32>,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            let applied = db::run_migrations(&context.db)
                .await
                .context("migrations failed")?;
            if cli.json {
                print_json(&serde_json::json!({ "applied": applied }))?;
            } else {
                println!("Migrations applied: {}", applied);
            }
        }
        Commands::Bootstrap => {
            let report = auth::bootstrap(&context.db, &context.config)
                .await
                .context("bootstrap failed")?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Roles created: {}; administrator created: {}",
                    report.roles_created, report.admin_created
                );
            }
        }
        Commands::Schedule(args) => {
            let today = args.date.resolve();
            let scheduler =
                SchedulerService::new(context.db.clone(), context.config.schedule_policy());
            let outcome = scheduler.ensure_schedules(today).await;
            if cli.json {
                print_json(&outcome)?;
            } else {
                render_schedule(today, &outcome);
            }
        }
        Commands::Report(args) => {
            let year = args.year.unwrap_or_else(|| today_utc().year());
            let report = ReportService::new(context.db.clone())
                .monthly_cost_report(year)
                .await
                .context("failed to build cost report")?;
            if cli.json {
                print_json(&report)?;
            } else {
                render_report(&report);
            }
        }
        Commands::Dashboard(args) => {
            let today = args.resolve();
            let limits = DashboardLimits {
                window_days: context.config.due_window_days,
                recent: context.config.dashboard_recent_limit,
                overdue: context.config.due_list_limit,
            };
            let dashboard = ReportService::new(context.db.clone())
                .dashboard(&DueService::new(context.db.clone()), today, limits)
                .await;
            if cli.json {
                print_json(&dashboard)?;
            } else {
                render_dashboard(&dashboard);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_schedule(today: NaiveDate, outcome: &ScheduleOutcome) {
    println!(
        "Schedule run for {}: {} asset(s) scanned, {} schedule(s) created",
        today, outcome.scanned, outcome.created
    );
    if !outcome.committed {
        println!("Batch rolled back; nothing was written");
    }
    if !outcome.skipped.is_empty() {
        println!("Skipped assets: {:?}", outcome.skipped);
    }
}

fn render_report(report: &MonthlyCostReport) {
    println!("Maintenance cost for {}", report.year);
    for month in &report.months {
        println!("- {:>2}: {:.2}", month.month, month.total_cost);
    }
    println!("Total: {:.2}", report.total_cost);
}

fn render_dashboard(dashboard: &Dashboard) {
    println!("Dashboard for {}", dashboard.today);
    for (label, kpis) in [("Year", &dashboard.year), ("Month", &dashboard.month)] {
        println!(
            "{} {}..{}: {} record(s), cost {:.2}, completion {:.1}%",
            label, kpis.start, kpis.end, kpis.record_count, kpis.total_cost, kpis.completion_rate
        );
    }
    println!(
        "Overdue: {} • due soon: {}",
        dashboard.overdue_count, dashboard.due_soon_count
    );
    for record in &dashboard.overdue_records {
        println!(
            "- record {} • asset {} • due {}",
            record.id,
            record.asset_id,
            record
                .next_due_date
                .map(|d| d.to_string())
                .unwrap_or_default()
        );
    }
}
