use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, error, info};

use crate::{config::AppConfig, errors::ServiceError, migrator::Migrator};

pub type DbPool = DatabaseConnection;

/// Pool tuning, usually derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections.min(cfg.db_max_connections),
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

impl DbConfig {
    /// Backend name for log fields; never includes credentials.
    pub fn backend(&self) -> &'static str {
        if self.url.starts_with("sqlite:") {
            "sqlite"
        } else if self.url.starts_with("postgres") {
            "postgres"
        } else {
            "unknown"
        }
    }
}

/// Opens the connection pool.
///
/// SQLite connections are opened by sqlx with `foreign_keys` enabled, which the
/// maintenance-to-asset cascade depends on.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    debug!(
        backend = config.backend(),
        max_connections = config.max_connections,
        "opening database pool"
    );
    gauge!("asset_maintenance_db.max_connections", config.max_connections as f64);

    match Database::connect(opt).await {
        Ok(pool) => {
            info!(backend = config.backend(), "database pool ready");
            Ok(pool)
        }
        Err(e) => {
            error!(backend = config.backend(), error = %e, "could not open database pool");
            counter!("asset_maintenance_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// Applies pending migrations and returns how many ran.
pub async fn run_migrations(pool: &DbPool) -> Result<usize, ServiceError> {
    let started = Instant::now();
    let pending = Migrator::get_pending_migrations(pool)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))?
        .len();

    if pending == 0 {
        debug!("schema is up to date");
        return Ok(0);
    }

    info!(pending, "applying migrations");
    Migrator::up(pool, None).await.map_err(|e| {
        error!(error = %e, elapsed = ?started.elapsed(), "migrations failed");
        ServiceError::MigrationError(e.to_string())
    })?;
    info!(applied = pending, elapsed = ?started.elapsed(), "migrations applied");
    Ok(pending)
}

/// Round-trips a ping; used by the health endpoints.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    if let Err(e) = pool.ping().await {
        error!(error = %e, "database ping failed");
        counter!("asset_maintenance_db.connection_failures", 1);
        return Err(ServiceError::DatabaseError(e));
    }
    gauge!(
        "asset_maintenance_db.ping_ms",
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("closing database pool");
    pool.close().await.map_err(ServiceError::DatabaseError)
}
