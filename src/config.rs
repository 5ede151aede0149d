use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DUE_WINDOW_DAYS: i64 = 30;
const DEFAULT_DUE_LIST_LIMIT: u64 = 10;
const DEFAULT_DASHBOARD_RECENT_LIMIT: u64 = 8;
const DEFAULT_PAGE_SIZE: u64 = 10;
const DEV_ADMIN_PASSWORD: &str = "admin123";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT expiration time in seconds (5min - 7d)
    #[validate(range(min = 300, max = 604800))]
    pub jwt_expiration: usize,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Username of the bootstrap administrator
    #[serde(default = "default_admin_username")]
    #[validate(length(min = 3, max = 50))]
    pub admin_username: String,

    /// Password of the bootstrap administrator. Only defaulted in development.
    #[serde(default)]
    pub admin_password: Option<String>,

    #[serde(default = "default_admin_email")]
    #[validate(email)]
    pub admin_email: String,

    /// Lookahead window used to flag records as due soon
    #[serde(default = "default_due_window_days")]
    #[validate(range(min = 1, max = 366))]
    pub due_window_days: i64,

    /// Cap applied to the home-page due list
    #[serde(default = "default_due_list_limit")]
    #[validate(range(min = 1, max = 100))]
    pub due_list_limit: u64,

    /// Days between a generated schedule and its next due date
    #[serde(default = "default_schedule_interval_days")]
    #[validate(range(min = 1, max = 3650))]
    pub schedule_interval_days: i64,

    #[serde(default = "default_dashboard_recent_limit")]
    #[validate(range(min = 1, max = 100))]
    pub dashboard_recent_limit: u64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u64,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every optional setting
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            admin_username: default_admin_username(),
            admin_password: None,
            admin_email: default_admin_email(),
            due_window_days: DEFAULT_DUE_WINDOW_DAYS,
            due_list_limit: DEFAULT_DUE_LIST_LIMIT,
            schedule_interval_days: default_schedule_interval_days(),
            dashboard_recent_limit: DEFAULT_DASHBOARD_RECENT_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_deref()
            .map(|origins| origins.split(',').any(|o| !o.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || self.is_development()
    }

    /// Password used when seeding the administrator account.
    ///
    /// Falls back to a well-known value in development; other environments must set
    /// `APP__ADMIN_PASSWORD`.
    pub fn bootstrap_admin_password(&self) -> Option<&str> {
        match self.admin_password.as_deref() {
            Some(pw) if !pw.trim().is_empty() => Some(pw),
            _ if self.is_development() => Some(DEV_ADMIN_PASSWORD),
            _ => None,
        }
    }

    /// Scheduling policy derived from this configuration
    pub fn schedule_policy(&self) -> crate::services::scheduler::SchedulePolicy {
        crate::services::scheduler::SchedulePolicy {
            interval_days: self.schedule_interval_days,
        }
    }

    /// Cross-field checks that `#[validate]` attributes cannot express
    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            errors.add(
                "cors_allowed_origins",
                invalid(
                    "cors_allowed_origins_required",
                    "list allowed origins in APP__CORS_ALLOWED_ORIGINS or set APP__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }

        let admin_password_ok = match self.admin_password.as_deref() {
            Some(pw) => pw.len() >= 8 && pw != DEV_ADMIN_PASSWORD,
            None => false,
        };
        if !self.is_development() && !admin_password_ok {
            errors.add(
                "admin_password",
                invalid(
                    "admin_password_required",
                    "APP__ADMIN_PASSWORD must be set to 8+ characters other than the development default",
                ),
            );
        }

        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                invalid("db_pool_bounds", "db_min_connections exceeds db_max_connections"),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    10
}

fn default_auth_issuer() -> String {
    "asset-maintenance-auth".to_string()
}

fn default_auth_audience() -> String {
    "asset-maintenance-api".to_string()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_due_window_days() -> i64 {
    DEFAULT_DUE_WINDOW_DAYS
}

fn default_due_list_limit() -> u64 {
    DEFAULT_DUE_LIST_LIMIT
}

fn default_schedule_interval_days() -> i64 {
    crate::services::scheduler::DEFAULT_INTERVAL_DAYS
}

fn default_dashboard_recent_limit() -> u64 {
    DEFAULT_DASHBOARD_RECENT_LIMIT
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(invalid("log_level", "expected trace, debug, info, warn or error")),
    }
}

/// Rejects short, placeholder and low-variety signing secrets.
fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    const PLACEHOLDERS: [&str; 4] = [
        "change-me",
        "changeme-asset-maintenance-secret",
        "your-secret-key",
        "default-secret-key",
    ];

    let secret = secret.trim();
    if secret.len() < 32 {
        return Err(invalid("jwt_secret", "must be at least 32 characters"));
    }
    if PLACEHOLDERS.iter().any(|p| secret.eq_ignore_ascii_case(p)) {
        return Err(invalid("jwt_secret", "placeholder secret; generate a random one"));
    }
    let distinct = secret.chars().collect::<std::collections::BTreeSet<_>>().len();
    if distinct < 10 {
        return Err(invalid("jwt_secret", "needs at least 10 distinct characters"));
    }
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` replaces the default filter when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("asset_maintenance_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads configuration from `config/`.
///
/// Later sources override earlier ones: built-in defaults, `config/default.toml`,
/// `config/{RUN_ENV}.toml`, then `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

pub fn load_config_from(config_dir: &str) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    let has_dir = Path::new(config_dir).is_dir();
    info!(environment = %run_env, config_dir, has_dir, "loading configuration");

    let config = Config::builder()
        .set_default("database_url", "sqlite://asset_maintenance.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", config_dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // jwt_secret has no default
    if config.get_string("jwt_secret").is_err() {
        error!("jwt_secret missing; set APP__JWT_SECRET");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret (set APP__JWT_SECRET)".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config
        .validate()
        .and_then(|_| app_config.validate_additional_constraints())
        .map_err(|e| {
            error!(errors = %e, "configuration rejected");
            AppConfigError::Validation(e)
        })?;

    info!(
        environment = %app_config.environment,
        due_window_days = app_config.due_window_days,
        "configuration loaded"
    );
    Ok(app_config)
}
