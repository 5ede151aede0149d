use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Asset Maintenance API",
        version = "1.0.0",
        description = r#"
# Asset Maintenance API

Inventory of organisational assets with recurring maintenance schedules.

## Features

- **Assets and asset types**: CRUD with soft delete and a restorable trash
- **Maintenance records**: logging, filtering by period and due state, monthly cost reports
- **Automatic schedules**: a yearly follow-up record is generated for every asset whose
  latest scheduled maintenance has come due
- **Dashboard**: yearly and monthly KPIs, overdue and upcoming work
- **Audit trail**: every create, update, delete, restore and purge

## Authentication

Obtain a token from `POST /auth/login` and send it on every request:

```
Authorization: Bearer <your-jwt-token>
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (server default, max 100).
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login and token issuance"),
        (name = "home", description = "Landing summary"),
        (name = "maintenance", description = "Maintenance records, reports and dashboard"),
        (name = "assets", description = "Asset inventory"),
        (name = "asset-types", description = "Asset categories"),
        (name = "users", description = "User administration"),
        (name = "audit", description = "Audit trail"),
        (name = "trash", description = "Soft-deleted items"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::auth::login_handler,
        crate::api_status,
        crate::health_check,
        crate::handlers::home::home,

        // Maintenance
        crate::handlers::maintenance::list_records,
        crate::handlers::maintenance::get_record,
        crate::handlers::maintenance::create_record,
        crate::handlers::maintenance::update_record,
        crate::handlers::maintenance::delete_record,
        crate::handlers::maintenance::cost_report,
        crate::handlers::maintenance::dashboard,

        // Assets
        crate::handlers::assets::list_assets,
        crate::handlers::assets::get_asset,
        crate::handlers::assets::create_asset,
        crate::handlers::assets::update_asset,
        crate::handlers::assets::delete_asset,
        crate::handlers::asset_types::list_asset_types,
        crate::handlers::asset_types::get_asset_type,
        crate::handlers::asset_types::create_asset_type,
        crate::handlers::asset_types::update_asset_type,
        crate::handlers::asset_types::delete_asset_type,

        // Administration
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::list_roles,
        crate::handlers::audit_logs::list_audit_logs,

        // Trash
        crate::handlers::trash::list_trash,
        crate::handlers::trash::restore_item,
        crate::handlers::trash::purge_item,
    ),
    components(
        schemas(
            crate::auth::LoginRequest,
            crate::auth::TokenResponse,
            crate::entities::maintenance_record::MaintenanceType,
            crate::entities::maintenance_record::MaintenanceStatus,
            crate::entities::asset::AssetStatus,
            crate::entities::audit_log::AuditModule,
            crate::entities::audit_log::AuditAction,
            crate::services::maintenance::MaintenanceInput,
            crate::services::assets::AssetInput,
            crate::services::asset_types::AssetTypeInput,
            crate::services::users::UserInput,
            crate::services::trash::TrashModule,
            crate::services::trash::TrashTarget,
            crate::services::trash::TrashItem,
            crate::services::reports::MonthlyCostReport,
            crate::services::reports::Dashboard,
            crate::handlers::home::HomeView,
            crate::handlers::maintenance::DashboardView,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_JSON_PATH, ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_area() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();

        assert!(json.contains("Asset Maintenance API"));
        assert!(json.contains("bearer_auth"));
        for path in [
            "/auth/login",
            "/api/v1/home",
            "/api/v1/maintenance",
            "/api/v1/maintenance/dashboard",
            "/api/v1/assets/{id}",
            "/api/v1/trash/purge",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    fn property(
        schema: utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        name: &str,
    ) -> serde_json::Value {
        let json = serde_json::to_value(schema).unwrap();
        json["properties"][name].clone()
    }

    #[test]
    fn entity_timestamps_are_documented_as_date_time() {
        use utoipa::PartialSchema;

        for schema in [
            crate::entities::asset::Model::schema(),
            crate::entities::maintenance_record::Model::schema(),
            crate::entities::user::Model::schema(),
        ] {
            let created = property(schema, "created_at");
            assert_eq!(created["type"], "string");
            assert_eq!(created["format"], "date-time");
        }
    }
}
