//! Fixtures shared by unit tests: an in-memory database and row builders.

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::db::{self, DbConfig};
use crate::entities::{
    asset, asset_type,
    maintenance_record::{self, MaintenanceStatus, MaintenanceType},
};

/// Fresh in-memory SQLite with the schema applied.
///
/// One connection only, since every pooled connection would get its own empty database.
pub async fn setup_db() -> DatabaseConnection {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("in-memory database");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn seed_asset_type(db: &DatabaseConnection, name: &str) -> asset_type::Model {
    asset_type::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert asset type")
}

pub async fn seed_asset(db: &DatabaseConnection, name: &str) -> asset::Model {
    let kind = seed_asset_type(db, &format!("{name} type")).await;
    asset::ActiveModel {
        name: Set(name.to_string()),
        price: Set(100.0),
        quantity: Set(1),
        status: Set(asset::AssetStatus::Active),
        asset_type_id: Set(kind.id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert asset")
}

/// `count` active assets sharing one type, named `{prefix}-{n}`
pub async fn seed_assets(db: &DatabaseConnection, prefix: &str, count: usize) {
    let kind = seed_asset_type(db, &format!("{prefix} fleet")).await;
    // insert_many skips before_save, so timestamps are filled in here
    let now = Utc::now();
    let rows: Vec<asset::ActiveModel> = (1..=count)
        .map(|n| asset::ActiveModel {
            name: Set(format!("{prefix}-{n}")),
            price: Set(100.0),
            quantity: Set(1),
            status: Set(asset::AssetStatus::Active),
            asset_type_id: Set(kind.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .collect();
    for chunk in rows.chunks(200) {
        asset::Entity::insert_many(chunk.to_vec())
            .exec(db)
            .await
            .expect("insert assets");
    }
}

/// Completed repair record, not yet persisted
pub fn new_record(
    asset_id: i32,
    maintenance_date: NaiveDate,
    next_due_date: Option<NaiveDate>,
    cost: f64,
) -> maintenance_record::ActiveModel {
    let now = Utc::now();
    maintenance_record::ActiveModel {
        asset_id: Set(asset_id),
        maintenance_date: Set(maintenance_date),
        maintenance_type: Set(MaintenanceType::Repair),
        description: Set(Some("bench test".into())),
        vendor: Set(None),
        person_in_charge: Set(Some("tech".into())),
        cost: Set(cost),
        next_due_date: Set(next_due_date),
        status: Set(MaintenanceStatus::Completed),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

pub async fn insert_record(
    db: &DatabaseConnection,
    asset_id: i32,
    maintenance_date: NaiveDate,
    next_due_date: Option<NaiveDate>,
    cost: f64,
) -> maintenance_record::Model {
    new_record(asset_id, maintenance_date, next_due_date, cost)
        .insert(db)
        .await
        .expect("insert maintenance record")
}
