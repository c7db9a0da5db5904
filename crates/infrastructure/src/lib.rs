//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_store;
mod in_memory_audit_repository;
mod postgres_audit_repository;
mod postgres_permission_repository;
mod postgres_principal_repository;
mod postgres_role_repository;

pub use in_memory_access_store::InMemoryAccessStore;
pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use postgres_audit_repository::{PostgresAuditLogRepository, PostgresAuditRepository};
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_principal_repository::PostgresPrincipalRepository;
pub use postgres_role_repository::PostgresRoleRepository;
