use gatewarden_application::AuditLogEntry;
use gatewarden_core::Principal;
use gatewarden_domain::{Permission, PermissionGroup, Role};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permission_ids: Vec<String>,
}

/// Incoming payload for partial role updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<String>>,
}

/// Incoming payload for replacing a role's permission set.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-permissions-request.ts"
)]
pub struct AssignPermissionsRequest {
    pub permission_ids: Vec<String>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub principal_id: String,
    pub role_name: String,
}

/// Incoming payload for role unassignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/remove-role-assignment-request.ts"
)]
pub struct RemoveRoleAssignmentRequest {
    pub principal_id: String,
    pub role_name: String,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub permission_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// API representation of a catalog permission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub resource: String,
    pub action: String,
    pub capability: String,
    pub description: Option<String>,
}

/// API representation of the derived permission grouping.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-group-response.ts"
)]
pub struct PermissionGroupResponse {
    pub resource: String,
    pub permissions: Vec<PermissionResponse>,
}

/// API representation of a principal and its role assignments.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/principal-response.ts"
)]
pub struct PrincipalResponse {
    pub principal_id: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub status: String,
}

/// API representation of an audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub event_id: String,
    pub subject: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub detail: Option<String>,
    pub created_at: String,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id.to_string(),
            name: value.name.to_string(),
            description: value.description,
            is_system: value.is_system,
            permission_ids: value
                .permission_ids
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            permission_id: value.id.to_string(),
            capability: value.capability(),
            resource: value.resource.to_string(),
            action: value.action.to_string(),
            description: value.description,
        }
    }
}

impl From<PermissionGroup> for PermissionGroupResponse {
    fn from(value: PermissionGroup) -> Self {
        Self {
            resource: value.resource.to_string(),
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
        }
    }
}

impl From<Principal> for PrincipalResponse {
    fn from(value: Principal) -> Self {
        Self {
            principal_id: value.id().to_string(),
            display_name: value.display_name().to_owned(),
            roles: value.roles().iter().cloned().collect(),
            status: value.status().as_str().to_owned(),
        }
    }
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            event_id: value.event_id,
            subject: value.subject,
            action: value.action,
            resource_type: value.resource_type,
            resource_id: value.resource_id,
            detail: value.detail,
            created_at: value.created_at,
        }
    }
}
