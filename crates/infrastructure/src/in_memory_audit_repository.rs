use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use gatewarden_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use gatewarden_core::AppResult;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory audit trail for tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let entry = AuditLogEntry {
            event_id: Uuid::new_v4().to_string(),
            subject: event.subject,
            action: event.action.as_str().to_owned(),
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            detail: event.detail,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.lock().await;

        Ok(entries
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .action
                    .as_ref()
                    .is_none_or(|action| &entry.action == action)
            })
            .filter(|entry| {
                query
                    .subject
                    .as_ref()
                    .is_none_or(|subject| &entry.subject == subject)
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}
