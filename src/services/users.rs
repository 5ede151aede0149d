use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::hash_password;
use crate::db::DbPool;
use crate::entities::audit_log::{AuditAction, AuditModule};
use crate::entities::user::{self, Model as User};
use crate::entities::{asset, role, SoftDeletable};
use crate::errors::ServiceError;
use crate::repositories::{search_condition, Page};
use crate::services::audit::AuditService;

pub static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,50}$").unwrap());

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UserInput {
    #[validate(regex = "USERNAME_PATTERN")]
    pub username: String,
    #[validate(email)]
    pub email: String,
    /// Required on create; on update a missing password keeps the current one
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub role_id: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Matched against username and email
    pub search: Option<String>,
    pub role_id: Option<i32>,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    audit: AuditService,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<User>, ServiceError> {
        let mut query = user::Entity::find_live();
        if let Some(cond) = filter.search.as_deref().and_then(|term| {
            search_condition(&[user::Column::Username, user::Column::Email], term)
        }) {
            query = query.filter(cond);
        }
        if let Some(role_id) = filter.role_id {
            query = query.filter(user::Column::RoleId.eq(role_id));
        }
        let paginator = query
            .order_by_asc(user::Column::Username)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(user::Entity::find_live().count(&*self.db_pool).await?)
    }

    pub async fn roles(&self) -> Result<Vec<role::Model>, ServiceError> {
        Ok(role::Entity::find()
            .order_by_asc(role::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<User, ServiceError> {
        user::Entity::find_live()
            .filter(user::Column::Id.eq(id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    async fn check_references(
        &self,
        input: &UserInput,
        exclude_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        // trashed accounts keep their username and email
        let mut clash = user::Entity::find().filter(
            Condition::any()
                .add(user::Column::Username.eq(input.username.as_str()))
                .add(user::Column::Email.eq(input.email.as_str())),
        );
        if let Some(id) = exclude_id {
            clash = clash.filter(user::Column::Id.ne(id));
        }
        if let Some(existing) = clash.one(db).await? {
            let field = if existing.username == input.username {
                "username"
            } else {
                "email"
            };
            return Err(ServiceError::Conflict(format!("{} is already taken", field)));
        }
        if role::Entity::find_by_id(input.role_id).one(db).await?.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "role {} does not exist",
                input.role_id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, actor: Option<i32>, input: UserInput) -> Result<User, ServiceError> {
        input.validate()?;
        let password = input
            .password
            .as_deref()
            .ok_or_else(|| ServiceError::ValidationError("password is required".to_string()))?;
        self.check_references(&input, None).await?;

        let created = user::ActiveModel {
            username: Set(input.username.clone()),
            email: Set(input.email.clone()),
            password_hash: Set(hash_password(password)?),
            role_id: Set(input.role_id),
            is_active: Set(input.is_active),
            last_login: Set(None),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(user_id = created.id, "user created");

        self.audit
            .record(
                actor,
                AuditModule::Users,
                AuditAction::Create,
                Some(created.id),
                format!("username={}", created.username),
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        actor: Option<i32>,
        id: i32,
        input: UserInput,
    ) -> Result<User, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        self.check_references(&input, Some(id)).await?;

        let mut active = existing.into_active_model();
        active.username = Set(input.username.clone());
        active.email = Set(input.email.clone());
        active.role_id = Set(input.role_id);
        active.is_active = Set(input.is_active);
        if let Some(password) = input.password.as_deref() {
            active.password_hash = Set(hash_password(password)?);
        }
        let updated = active.update(&*self.db_pool).await?;

        self.audit
            .record(
                actor,
                AuditModule::Users,
                AuditAction::Update,
                Some(id),
                format!("username={}", updated.username),
            )
            .await;
        Ok(updated)
    }

    /// Moves the user to the trash. Refused for the caller's own account and while the
    /// user still owns live assets.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), ServiceError> {
        if actor == Some(id) {
            return Err(ServiceError::InvalidOperation(
                "you cannot delete your own account".to_string(),
            ));
        }
        let existing = self.get(id).await?;
        let owned = asset::Entity::find_live()
            .filter(asset::Column::UserId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if owned > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "user '{}' still owns {} asset(s)",
                existing.username, owned
            )));
        }

        let username = existing.username.clone();
        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&*self.db_pool).await?;

        self.audit
            .record(
                actor,
                AuditModule::Users,
                AuditAction::Delete,
                Some(id),
                format!("username={}", username),
            )
            .await;
        Ok(())
    }
}
