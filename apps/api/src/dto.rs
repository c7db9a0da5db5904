//! API transport types with exported TypeScript definitions.

mod access;
mod common;
mod security;

pub use access::{AccessCheckRequest, AccessCheckResponse};
pub use common::HealthResponse;
pub use security::{
    AssignPermissionsRequest, AssignRoleRequest, AuditLogEntryResponse, CreateRoleRequest,
    PermissionGroupResponse, PermissionResponse, PrincipalResponse, RemoveRoleAssignmentRequest,
    RoleResponse, UpdateRoleRequest,
};
