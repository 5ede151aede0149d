pub mod asset_types;
pub mod assets;
pub mod audit_logs;
pub mod common;
pub mod home;
pub mod maintenance;
pub mod trash;
pub mod users;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        asset_types::AssetTypeService, assets::AssetService, audit::AuditService, due::DueService,
        maintenance::MaintenanceService, reports::ReportService, scheduler::SchedulerService,
        trash::TrashService, users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub scheduler: Arc<SchedulerService>,
    pub due: Arc<DueService>,
    pub reports: Arc<ReportService>,
    pub maintenance: Arc<MaintenanceService>,
    pub assets: Arc<AssetService>,
    pub asset_types: Arc<AssetTypeService>,
    pub users: Arc<UserService>,
    pub audit: Arc<AuditService>,
    pub trash: Arc<TrashService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let audit = AuditService::new(db_pool.clone());

        Self {
            scheduler: Arc::new(SchedulerService::new(
                db_pool.clone(),
                config.schedule_policy(),
            )),
            due: Arc::new(DueService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            maintenance: Arc::new(MaintenanceService::new(db_pool.clone(), audit.clone())),
            assets: Arc::new(AssetService::new(db_pool.clone(), audit.clone())),
            asset_types: Arc::new(AssetTypeService::new(db_pool.clone(), audit.clone())),
            users: Arc::new(UserService::new(db_pool.clone(), audit.clone())),
            trash: Arc::new(TrashService::new(db_pool, audit.clone())),
            audit: Arc::new(audit),
        }
    }
}
