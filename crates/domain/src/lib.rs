//! Domain model for the Gatewarden access-control core.

#![forbid(unsafe_code)]

mod audit;
mod catalog;
mod evaluation;
mod guard;
mod permission;
mod role;

pub use audit::AuditAction;
pub use catalog::{SeedPermission, seed_catalog};
pub use evaluation::{
    AccessSnapshot, Decision, DenyReason, GrantSource, WILDCARD_ROLE, baseline_snapshot, evaluate,
};
pub use guard::{GuardEvent, GuardState};
pub use permission::{ActionName, Permission, PermissionGroup, ResourceName};
pub use role::{Role, RoleName, SystemRole};
