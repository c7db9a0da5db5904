//! Repository ports for the permission catalog, role registry and
//! principal directory.

use async_trait::async_trait;
use gatewarden_core::{AppResult, PermissionId, Principal, PrincipalId, RoleId};
use gatewarden_domain::{ActionName, Permission, ResourceName, Role, RoleName};

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: RoleName,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Catalog permissions granted by the role.
    pub permission_ids: Vec<PermissionId>,
}

/// Partial update applied to an existing role.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    /// Replacement role name.
    pub name: Option<RoleName>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement permission set.
    pub permission_ids: Option<Vec<PermissionId>>,
}

/// Repository port for the permission catalog.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Lists the catalog ordered by resource, then action.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Finds a permission by its unique `(resource, action)` pair.
    async fn find_by_resource_action(
        &self,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<Option<Permission>>;

    /// Resolves permissions by id; unknown ids are absent from the result.
    async fn find_permissions(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>>;

    /// Inserts catalog entries whose `(resource, action)` pair is not yet
    /// present and returns how many were inserted.
    async fn insert_missing(&self, permissions: Vec<Permission>) -> AppResult<u64>;
}

/// Repository port for role persistence.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists all roles ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds a role by id.
    async fn find_role(&self, id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Persists a new role; fails with `Conflict` on a duplicate name.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Replaces a stored role and its grants transactionally.
    async fn update_role(&self, role: Role) -> AppResult<()>;

    /// Deletes a role and its grants.
    async fn delete_role(&self, id: RoleId) -> AppResult<()>;
}

/// Repository port for the principal directory and role assignments.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Loads a principal with its current role assignments.
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>>;

    /// Lists all principals ordered by display name.
    async fn list_principals(&self) -> AppResult<Vec<Principal>>;

    /// Counts principals currently holding the role.
    async fn count_holding_role(&self, role_id: RoleId) -> AppResult<u64>;

    /// Assigns a role to a principal; idempotent.
    async fn assign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()>;

    /// Removes a role assignment; fails with `NotFound` when absent.
    async fn unassign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()>;
}
