pub mod asset;
pub mod asset_type;
pub mod audit_log;
pub mod maintenance_record;
pub mod role;
pub mod user;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

/// Entities whose rows are hidden by stamping `deleted_at` instead of being removed.
pub trait SoftDeletable: EntityTrait {
    fn deleted_at_column() -> Self::Column;

    /// Rows that have not been soft-deleted
    fn find_live() -> Select<Self> {
        Self::find().filter(Self::deleted_at_column().is_null())
    }

    /// Rows currently in the trash
    fn find_trashed() -> Select<Self> {
        Self::find().filter(Self::deleted_at_column().is_not_null())
    }
}

impl SoftDeletable for asset::Entity {
    fn deleted_at_column() -> Self::Column {
        asset::Column::DeletedAt
    }
}

impl SoftDeletable for asset_type::Entity {
    fn deleted_at_column() -> Self::Column {
        asset_type::Column::DeletedAt
    }
}

impl SoftDeletable for user::Entity {
    fn deleted_at_column() -> Self::Column {
        user::Column::DeletedAt
    }
}

impl SoftDeletable for maintenance_record::Entity {
    fn deleted_at_column() -> Self::Column {
        maintenance_record::Column::DeletedAt
    }
}
