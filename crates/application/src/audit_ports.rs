//! Audit ports shared by application use-cases.

use async_trait::async_trait;
use gatewarden_core::AppResult;
use gatewarden_domain::AuditAction;

/// Event appended to the audit trail by application use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Actor subject (principal id, or `system` at bootstrap).
    pub subject: String,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Kind of resource the event concerns.
    pub resource_type: String,
    /// Identifier of the concerned resource.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Stable event identifier.
    pub event_id: String,
    /// Actor subject.
    pub subject: String,
    /// Stable action identifier.
    pub action: String,
    /// Event resource type.
    pub resource_type: String,
    /// Event resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
    /// Event timestamp in RFC3339.
    pub created_at: String,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional action filter.
    pub action: Option<String>,
    /// Optional subject filter.
    pub subject: Option<String>,
}

/// Port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the audit trail.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Port for reading the audit log.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists most recent audit entries, newest first.
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;
}
