//! Business services. Each holds a shared pool handle and is cheap to clone.

pub mod asset_types;
pub mod assets;
pub mod audit;
pub mod due;
pub mod maintenance;
pub mod reports;
pub mod scheduler;
pub mod trash;
pub mod users;

use chrono::{NaiveDate, Utc};

/// Calendar date used as "today" by request handlers
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
