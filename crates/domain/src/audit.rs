use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when the permission catalog is seeded with new entries.
    PermissionCatalogSeeded,
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a role is updated.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a role's permission set is replaced.
    RolePermissionsAssigned,
    /// Emitted when a role is assigned to a principal.
    RoleAssigned,
    /// Emitted when a role is removed from a principal.
    RoleUnassigned,
    /// Emitted when an enforced access check denies a principal.
    AccessDenied,
    /// Emitted when the wildcard role satisfies an enforced access check.
    WildcardAccessUsed,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionCatalogSeeded => "security.catalog.seeded",
            Self::RoleCreated => "security.role.created",
            Self::RoleUpdated => "security.role.updated",
            Self::RoleDeleted => "security.role.deleted",
            Self::RolePermissionsAssigned => "security.role.permissions_assigned",
            Self::RoleAssigned => "security.role.assigned",
            Self::RoleUnassigned => "security.role.unassigned",
            Self::AccessDenied => "security.access.denied",
            Self::WildcardAccessUsed => "security.access.wildcard_used",
        }
    }
}
