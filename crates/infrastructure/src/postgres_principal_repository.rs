use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatewarden_application::PrincipalRepository;
use gatewarden_core::{AppError, AppResult, Principal, PrincipalId, PrincipalStatus, RoleId};

/// PostgreSQL-backed principal directory.
#[derive(Clone)]
pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    principal_id: Uuid,
    display_name: String,
    status: String,
    role_name: Option<String>,
}

const PRINCIPAL_SELECT: &str = r#"
    SELECT
        principals.id AS principal_id,
        principals.display_name,
        principals.status,
        roles.name AS role_name
    FROM principals
    LEFT JOIN principal_roles
        ON principal_roles.principal_id = principals.id
    LEFT JOIN rbac_roles AS roles
        ON roles.id = principal_roles.role_id
"#;

fn fold_principals(rows: Vec<PrincipalRow>) -> AppResult<Vec<Principal>> {
    let mut assembled: Vec<(Uuid, String, PrincipalStatus, BTreeSet<String>)> = Vec::new();

    for row in rows {
        let known = assembled.iter().any(|(id, _, _, _)| *id == row.principal_id);
        if !known {
            let status = PrincipalStatus::from_str(row.status.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored principal status '{}': {error}",
                    row.status
                ))
            })?;
            assembled.push((row.principal_id, row.display_name, status, BTreeSet::new()));
        }

        if let Some(role_name) = row.role_name
            && let Some((_, _, _, roles)) = assembled
                .iter_mut()
                .find(|(id, _, _, _)| *id == row.principal_id)
        {
            roles.insert(role_name);
        }
    }

    Ok(assembled
        .into_iter()
        .map(|(id, display_name, status, roles)| {
            Principal::new(PrincipalId::from_uuid(id), display_name, roles, status)
        })
        .collect())
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>> {
        let query = format!("{PRINCIPAL_SELECT} WHERE principals.id = $1");
        let rows = sqlx::query_as::<_, PrincipalRow>(query.as_str())
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve principal: {error}")))?;

        Ok(fold_principals(rows)?.into_iter().next())
    }

    async fn list_principals(&self) -> AppResult<Vec<Principal>> {
        let query = format!("{PRINCIPAL_SELECT} ORDER BY principals.display_name, principals.id");
        let rows = sqlx::query_as::<_, PrincipalRow>(query.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list principals: {error}")))?;

        fold_principals(rows)
    }

    async fn count_holding_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM principal_roles WHERE role_id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count role assignments: {error}"))
        })?;

        Ok(count.unsigned_abs())
    }

    async fn assign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO principal_roles (principal_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (principal_id, role_id) DO NOTHING
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?;

        Ok(())
    }

    async fn unassign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            "DELETE FROM principal_roles WHERE principal_id = $1 AND role_id = $2",
        )
        .bind(principal_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role assignment: {error}"))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role assignment '{principal_id}:{role_id}' was not found"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gatewarden_application::{PrincipalRepository, RoleRepository};
    use gatewarden_core::{AppError, PrincipalId};
    use gatewarden_domain::{Role, RoleName};
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use crate::PostgresRoleRepository;

    use super::PostgresPrincipalRepository;

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
            panic!("failed to run migrations for postgres principal tests: {error}");
        }

        Some(pool)
    }

    async fn insert_principal(pool: &PgPool, display_name: &str) -> PrincipalId {
        let principal_id = PrincipalId::new();
        let insert = sqlx::query(
            r#"
            INSERT INTO principals (id, display_name, status)
            VALUES ($1, $2, 'active')
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(display_name)
        .execute(pool)
        .await;
        assert!(insert.is_ok());

        principal_id
    }

    #[tokio::test]
    async fn assignment_is_idempotent_and_unassign_of_absent_pair_fails() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let roles = PostgresRoleRepository::new(pool.clone());
        let repository = PostgresPrincipalRepository::new(pool.clone());

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = match RoleName::new(format!("Dispatch {suffix}")) {
            Ok(name) => name,
            Err(error) => panic!("invalid test role name: {error}"),
        };
        let role = Role::custom(name.clone(), None, BTreeSet::new());
        assert!(roles.insert_role(role.clone()).await.is_ok());

        let principal_id = insert_principal(&pool, "Dispatch Operator").await;

        assert!(repository.assign_role(principal_id, role.id).await.is_ok());
        assert!(repository.assign_role(principal_id, role.id).await.is_ok());
        assert_eq!(repository.count_holding_role(role.id).await.unwrap_or(0), 1);

        let loaded = match repository.find_principal(principal_id).await {
            Ok(Some(principal)) => principal,
            Ok(None) => panic!("inserted principal is missing"),
            Err(error) => panic!("failed to load principal: {error}"),
        };
        assert!(loaded.holds_role(name.as_str()));

        assert!(repository.unassign_role(principal_id, role.id).await.is_ok());
        let absent = repository.unassign_role(principal_id, role.id).await;
        assert!(matches!(absent, Err(AppError::NotFound(_))));
    }
}
