use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use gatewarden_application::RoleRepository;
use gatewarden_core::{AppError, AppResult, PermissionId, RoleId};
use gatewarden_domain::{Role, RoleName};

/// PostgreSQL-backed role registry storage.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_grants(
        transaction: &mut Transaction<'_, Postgres>,
        role_id: RoleId,
        permission_ids: &BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM rbac_role_grants WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role grants: {error}"))
            })?;

        for permission_id in permission_ids {
            sqlx::query(
                r#"
                INSERT INTO rbac_role_grants (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist role grant: {error}"))
            })?;
        }

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: Uuid,
    name: String,
    description: Option<String>,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    permission_id: Option<Uuid>,
}

const ROLE_SELECT: &str = r#"
    SELECT
        roles.id AS role_id,
        roles.name,
        roles.description,
        roles.is_system,
        roles.created_at,
        roles.updated_at,
        grants.permission_id
    FROM rbac_roles AS roles
    LEFT JOIN rbac_role_grants AS grants
        ON grants.role_id = roles.id
"#;

fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut by_id: HashMap<Uuid, Role> = HashMap::new();

    for row in rows {
        let entry = match by_id.entry(row.role_id) {
            std::collections::hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let name = RoleName::new(row.name.as_str()).map_err(|error| {
                    AppError::Internal(format!("invalid stored role name '{}': {error}", row.name))
                })?;
                vacant.insert(Role {
                    id: RoleId::from_uuid(row.role_id),
                    name,
                    description: row.description,
                    is_system: row.is_system,
                    permission_ids: BTreeSet::new(),
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            }
        };

        if let Some(permission_id) = row.permission_id {
            entry
                .permission_ids
                .insert(PermissionId::from_uuid(permission_id));
        }
    }

    let mut roles = by_id.into_values().collect::<Vec<_>>();
    roles.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(roles)
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(ROLE_SELECT)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    async fn find_role(&self, id: RoleId) -> AppResult<Option<Role>> {
        let query = format!("{ROLE_SELECT} WHERE roles.id = $1");
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let query = format!("{ROLE_SELECT} WHERE roles.name = $1");
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO rbac_roles (id, name, description, is_system, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.is_system)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name.as_str()))?;

        Self::replace_grants(&mut transaction, role.id, &role.permission_ids).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_roles
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.updated_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name.as_str()))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id
            )));
        }

        Self::replace_grants(&mut transaction, role.id, &role.permission_ids).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    async fn delete_role(&self, id: RoleId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM rbac_roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await;

        let rows_affected = match result {
            Ok(done) => done.rows_affected(),
            Err(error) => {
                // 23503: principal_roles still references the role.
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23503")
                {
                    return Err(AppError::Conflict(format!(
                        "role '{id}' is still assigned to principals"
                    )));
                }
                return Err(AppError::Internal(format!("failed to delete role: {error}")));
            }
        };

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{id}' was not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gatewarden_application::{PermissionRepository, RoleRepository};
    use gatewarden_core::AppError;
    use gatewarden_domain::{ActionName, Permission, ResourceName, Role, RoleName};
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use crate::PostgresPermissionRepository;

    use super::PostgresRoleRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres role tests: {error}");
        }

        Some(pool)
    }

    fn role_name(value: &str) -> RoleName {
        match RoleName::new(value) {
            Ok(name) => name,
            Err(error) => panic!("invalid test role name: {error}"),
        }
    }

    fn catalog_permission(resource: &str, action: &str) -> Permission {
        let resource = match ResourceName::new(resource) {
            Ok(resource) => resource,
            Err(error) => panic!("invalid test resource: {error}"),
        };
        let action = match ActionName::new(action) {
            Ok(action) => action,
            Err(error) => panic!("invalid test action: {error}"),
        };
        Permission::new(resource, action, None)
    }

    #[tokio::test]
    async fn role_round_trips_with_grants_and_rejects_duplicates() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let permissions = PostgresPermissionRepository::new(pool.clone());
        let repository = PostgresRoleRepository::new(pool);

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let resource = format!("exports_{suffix}");
        let inserted = permissions
            .insert_missing(vec![catalog_permission(resource.as_str(), "read")])
            .await;
        assert!(inserted.is_ok());

        let stored = match permissions.list_permissions().await {
            Ok(stored) => stored,
            Err(error) => panic!("failed to list permissions: {error}"),
        };
        let permission_id = match stored
            .iter()
            .find(|permission| permission.resource.as_str() == resource.as_str())
        {
            Some(permission) => permission.id,
            None => panic!("seeded permission is missing"),
        };

        let name = format!("Exporters {suffix}");
        let role = Role::custom(
            role_name(name.as_str()),
            None,
            BTreeSet::from([permission_id]),
        );
        assert!(repository.insert_role(role.clone()).await.is_ok());

        let loaded = match repository.find_role_by_name(name.as_str()).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => panic!("inserted role is missing"),
            Err(error) => panic!("failed to load role: {error}"),
        };
        assert_eq!(loaded.permission_ids, BTreeSet::from([permission_id]));

        let duplicate = Role::custom(role_name(name.as_str()), None, BTreeSet::new());
        let conflict = repository.insert_role(duplicate).await;
        assert!(matches!(conflict, Err(AppError::Conflict(_))));

        assert!(repository.delete_role(role.id).await.is_ok());
    }
}
