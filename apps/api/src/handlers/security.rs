use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use gatewarden_core::{AppError, PermissionId, Principal, PrincipalId, RoleId};
use gatewarden_domain::RoleName;

use crate::dto::{
    AssignPermissionsRequest, AssignRoleRequest, AuditLogEntryResponse, CreateRoleRequest,
    PermissionGroupResponse, PermissionResponse, PrincipalResponse, RemoveRoleAssignmentRequest,
    RoleResponse, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod assignments;
mod audit;
mod catalog;
mod roles;

pub use assignments::{assign_role_handler, list_principals_handler, unassign_role_handler};
pub use audit::list_audit_log_handler;
pub use catalog::{list_permission_groups_handler, list_permissions_handler};
pub use roles::{
    assign_permissions_handler, create_role_handler, delete_role_handler, get_role_handler,
    list_roles_handler, update_role_handler,
};

fn parse_permission_ids(values: &[String]) -> Result<Vec<PermissionId>, AppError> {
    values
        .iter()
        .map(|value| {
            uuid::Uuid::parse_str(value)
                .map(PermissionId::from_uuid)
                .map_err(|_| {
                    AppError::Validation(format!("'{value}' is not a valid permission id"))
                })
        })
        .collect()
}

fn parse_principal_id(value: &str) -> Result<PrincipalId, AppError> {
    uuid::Uuid::parse_str(value)
        .map(PrincipalId::from_uuid)
        .map_err(|_| AppError::Validation(format!("'{value}' is not a valid principal id")))
}
