//! Gatewarden API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod bootstrap;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use gatewarden_application::{
    AuditLogRepository, AuditRepository, AuthorizationService, PermissionCatalogService,
    PermissionRepository, PrincipalRepository, RoleRegistryService, RoleRepository,
};
use gatewarden_core::AppError;
use gatewarden_infrastructure::{
    PostgresAuditLogRepository, PostgresAuditRepository, PostgresPermissionRepository,
    PostgresPrincipalRepository, PostgresRoleRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Role names allowed through the coarse guard on `/api/security`.
const SECURITY_ADMIN_ROLES: &[&str] = &["SuperAdmin", "Admin"];

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let permission_repository: Arc<dyn PermissionRepository> =
        Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let role_repository: Arc<dyn RoleRepository> =
        Arc::new(PostgresRoleRepository::new(pool.clone()));
    let principal_repository: Arc<dyn PrincipalRepository> =
        Arc::new(PostgresPrincipalRepository::new(pool.clone()));
    let audit_repository: Arc<dyn AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool.clone()));
    let audit_log_repository: Arc<dyn AuditLogRepository> =
        Arc::new(PostgresAuditLogRepository::new(pool.clone()));

    let authorization_service = AuthorizationService::new(
        role_repository.clone(),
        permission_repository.clone(),
        audit_repository.clone(),
    );
    let catalog_service =
        PermissionCatalogService::new(permission_repository.clone(), audit_repository.clone());
    let registry_service = RoleRegistryService::new(
        authorization_service.clone(),
        role_repository.clone(),
        principal_repository.clone(),
        permission_repository.clone(),
        audit_repository.clone(),
        audit_log_repository,
    );

    bootstrap::provision(
        &catalog_service,
        &role_repository,
        &permission_repository,
        &audit_repository,
    )
    .await?;

    let app_state = AppState {
        catalog_service,
        registry_service,
        authorization_service,
        principal_repository,
        frontend_url: config.frontend_url.clone(),
    };

    let security_routes = Router::new()
        .route(
            "/api/security/permissions",
            get(handlers::security::list_permissions_handler),
        )
        .route(
            "/api/security/permission-groups",
            get(handlers::security::list_permission_groups_handler),
        )
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler)
                .post(handlers::security::create_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}",
            get(handlers::security::get_role_handler)
                .patch(handlers::security::update_role_handler)
                .delete(handlers::security::delete_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}/permissions",
            put(handlers::security::assign_permissions_handler),
        )
        .route(
            "/api/security/principals",
            get(handlers::security::list_principals_handler),
        )
        .route(
            "/api/security/role-assignments",
            post(handlers::security::assign_role_handler),
        )
        .route(
            "/api/security/role-unassignments",
            post(handlers::security::unassign_role_handler),
        )
        .route(
            "/api/security/audit-log",
            get(handlers::security::list_audit_log_handler),
        )
        .route_layer(from_fn(middleware::require_role))
        .layer(axum::Extension(middleware::RequiredRoles(
            SECURITY_ADMIN_ROLES,
        )));

    let protected_routes = Router::new()
        .merge(security_routes)
        .route(
            "/api/access/check",
            post(handlers::access::check_access_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_principal,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "gatewarden-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
