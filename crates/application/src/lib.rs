//! Application services and ports for the Gatewarden access core.

#![forbid(unsafe_code)]

mod access_ports;
mod audit_ports;
mod authorization_service;
mod catalog_service;
mod registry_service;

pub use access_ports::{
    CreateRoleInput, PermissionRepository, PrincipalRepository, RolePatch, RoleRepository,
};
pub use audit_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
pub use authorization_service::AuthorizationService;
pub use catalog_service::{PermissionCatalogService, SYSTEM_SUBJECT};
pub use registry_service::RoleRegistryService;
