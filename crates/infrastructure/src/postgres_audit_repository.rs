use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use gatewarden_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use gatewarden_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        tracing::debug!(
            subject = event.subject.as_str(),
            action = event.action.as_str(),
            resource_type = event.resource_type.as_str(),
            resource_id = event.resource_id.as_str(),
            "appending audit event"
        );

        sqlx::query(
            r#"
            INSERT INTO audit_events (subject, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.subject)
        .bind(event.action.as_str())
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}

/// PostgreSQL-backed repository for audit log read models.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    event_id: uuid::Uuid,
    subject: String,
    action: String,
    resource_type: String,
    resource_id: String,
    detail: Option<String>,
    created_at: String,
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let capped_offset = query.offset.min(5_000) as i64;
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id AS event_id,
                subject,
                action,
                resource_type,
                resource_id,
                detail,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM audit_events
            WHERE ($1::TEXT IS NULL OR action = $1)
                AND ($2::TEXT IS NULL OR subject = $2)
            ORDER BY created_at DESC
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(query.action)
        .bind(query.subject)
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit log entries: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| AuditLogEntry {
                event_id: row.event_id.to_string(),
                subject: row.subject,
                action: row.action,
                resource_type: row.resource_type,
                resource_id: row.resource_id,
                detail: row.detail,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use gatewarden_application::{
        AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository,
    };
    use gatewarden_domain::AuditAction;
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use super::{PostgresAuditLogRepository, PostgresAuditRepository};

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
            panic!("failed to run migrations for postgres audit tests: {error}");
        }

        Some(pool)
    }

    #[tokio::test]
    async fn appended_events_are_listed_newest_first() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let repository = PostgresAuditRepository::new(pool.clone());
        let log = PostgresAuditLogRepository::new(pool);

        let subject = uuid::Uuid::new_v4().to_string();
        let first = repository
            .append_event(AuditEvent {
                subject: subject.clone(),
                action: AuditAction::RoleCreated,
                resource_type: "rbac_role".to_owned(),
                resource_id: "role-1".to_owned(),
                detail: None,
            })
            .await;
        assert!(first.is_ok());

        let second = repository
            .append_event(AuditEvent {
                subject: subject.clone(),
                action: AuditAction::RoleDeleted,
                resource_type: "rbac_role".to_owned(),
                resource_id: "role-1".to_owned(),
                detail: Some("cleanup".to_owned()),
            })
            .await;
        assert!(second.is_ok());

        let listed = log
            .list_recent_entries(AuditLogQuery {
                limit: 10,
                offset: 0,
                action: None,
                subject: Some(subject),
            })
            .await;
        assert!(listed.is_ok());
        let listed = listed.unwrap_or_default();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].action, "security.role.deleted");
    }
}
