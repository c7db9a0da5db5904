use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatewarden_application::PermissionRepository;
use gatewarden_core::{AppError, AppResult, PermissionId};
use gatewarden_domain::{ActionName, Permission, ResourceName};

/// PostgreSQL-backed permission catalog.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    resource: String,
    action: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        let resource = ResourceName::from_str(self.resource.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored resource '{}': {error}",
                self.resource
            ))
        })?;
        let action = ActionName::from_str(self.action.as_str()).map_err(|error| {
            AppError::Internal(format!("invalid stored action '{}': {error}", self.action))
        })?;

        Ok(Permission {
            id: PermissionId::from_uuid(self.id),
            resource,
            action,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource, action, description, created_at, updated_at
            FROM rbac_permissions
            ORDER BY resource, action
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn find_by_resource_action(
        &self,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource, action, description, created_at, updated_at
            FROM rbac_permissions
            WHERE resource = $1 AND action = $2
            LIMIT 1
            "#,
        )
        .bind(resource.as_str())
        .bind(action.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permission: {error}")))?;

        row.map(PermissionRow::into_permission).transpose()
    }

    async fn find_permissions(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let id_values = ids.iter().map(PermissionId::as_uuid).collect::<Vec<_>>();

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource, action, description, created_at, updated_at
            FROM rbac_permissions
            WHERE id = ANY($1)
            ORDER BY resource, action
            "#,
        )
        .bind(id_values)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn insert_missing(&self, permissions: Vec<Permission>) -> AppResult<u64> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        let mut inserted = 0;
        for permission in permissions {
            let rows_affected = sqlx::query(
                r#"
                INSERT INTO rbac_permissions (id, resource, action, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (resource, action) DO NOTHING
                "#,
            )
            .bind(permission.id.as_uuid())
            .bind(permission.resource.as_str())
            .bind(permission.action.as_str())
            .bind(permission.description.as_deref())
            .bind(permission.created_at)
            .bind(permission.updated_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist catalog permission: {error}"))
            })?
            .rows_affected();

            inserted += rows_affected;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(inserted)
    }
}
