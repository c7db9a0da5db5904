use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use gatewarden_application::{PermissionRepository, PrincipalRepository, RoleRepository};
use gatewarden_core::{
    AppError, AppResult, PermissionId, Principal, PrincipalId, PrincipalStatus, RoleId,
};
use gatewarden_domain::{ActionName, Permission, ResourceName, Role};
use tokio::sync::RwLock;

/// In-memory implementation of the catalog, role and principal ports.
///
/// Backs unit and integration tests; not suitable for multi-process
/// deployments.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    principals: RwLock<HashMap<PrincipalId, (String, PrincipalStatus)>>,
    assignments: RwLock<BTreeSet<(PrincipalId, RoleId)>>,
}

impl InMemoryAccessStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a principal in the directory.
    pub async fn insert_principal(
        &self,
        id: PrincipalId,
        display_name: impl Into<String>,
        status: PrincipalStatus,
    ) {
        self.principals
            .write()
            .await
            .insert(id, (display_name.into(), status));
    }

    async fn role_names_for(&self, principal_id: PrincipalId) -> BTreeSet<String> {
        let assignments = self.assignments.read().await;
        let roles = self.roles.read().await;

        assignments
            .iter()
            .filter(|(assigned, _)| assigned == &principal_id)
            .filter_map(|(_, role_id)| roles.get(role_id).map(|role| role.name.to_string()))
            .collect()
    }

    async fn assemble_principal(
        &self,
        id: PrincipalId,
        display_name: String,
        status: PrincipalStatus,
    ) -> Principal {
        let role_names = self.role_names_for(id).await;
        Principal::new(id, display_name, role_names, status)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAccessStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;
        let mut values: Vec<Permission> = permissions.values().cloned().collect();
        values.sort_by(|left, right| {
            (&left.resource, &left.action).cmp(&(&right.resource, &right.action))
        });
        Ok(values)
    }

    async fn find_by_resource_action(
        &self,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .find(|permission| &permission.resource == resource && &permission.action == action)
            .cloned())
    }

    async fn find_permissions(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| permissions.get(id).cloned())
            .collect())
    }

    async fn insert_missing(&self, entries: Vec<Permission>) -> AppResult<u64> {
        let mut permissions = self.permissions.write().await;
        let mut inserted = 0;

        for entry in entries {
            let exists = permissions.values().any(|stored| {
                stored.resource == entry.resource && stored.action == entry.action
            });
            if !exists {
                permissions.insert(entry.id, entry);
                inserted += 1;
            }
        }

        Ok(inserted)
    }
}

#[async_trait]
impl RoleRepository for InMemoryAccessStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;
        let mut values: Vec<Role> = roles.values().cloned().collect();
        values.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(values)
    }

    async fn find_role(&self, id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.name.as_str() == name)
            .cloned())
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.values().any(|stored| stored.name == role.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        roles.insert(role.id, role);
        Ok(())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        let name_taken = roles
            .values()
            .any(|stored| stored.name == role.name && stored.id != role.id);
        if name_taken {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        match roles.get_mut(&role.id) {
            Some(stored) => {
                *stored = role;
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id
            ))),
        }
    }

    async fn delete_role(&self, id: RoleId) -> AppResult<()> {
        let still_assigned = self
            .assignments
            .read()
            .await
            .iter()
            .any(|(_, role_id)| role_id == &id);
        if still_assigned {
            return Err(AppError::Conflict(format!(
                "role '{id}' is still assigned to principals"
            )));
        }

        match self.roles.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("role '{id}' was not found"))),
        }
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryAccessStore {
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>> {
        let entry = self.principals.read().await.get(&id).cloned();
        match entry {
            Some((display_name, status)) => {
                Ok(Some(self.assemble_principal(id, display_name, status).await))
            }
            None => Ok(None),
        }
    }

    async fn list_principals(&self) -> AppResult<Vec<Principal>> {
        let entries: Vec<(PrincipalId, String, PrincipalStatus)> = self
            .principals
            .read()
            .await
            .iter()
            .map(|(id, (display_name, status))| (*id, display_name.clone(), *status))
            .collect();

        let mut principals = Vec::with_capacity(entries.len());
        for (id, display_name, status) in entries {
            principals.push(self.assemble_principal(id, display_name, status).await);
        }
        principals.sort_by(|left, right| left.display_name().cmp(right.display_name()));

        Ok(principals)
    }

    async fn count_holding_role(&self, role_id: RoleId) -> AppResult<u64> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|(_, assigned)| assigned == &role_id)
            .count() as u64)
    }

    async fn assign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        if !self.principals.read().await.contains_key(&principal_id) {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' was not found"
            )));
        }

        self.assignments.write().await.insert((principal_id, role_id));
        Ok(())
    }

    async fn unassign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        let removed = self
            .assignments
            .write()
            .await
            .remove(&(principal_id, role_id));
        if !removed {
            return Err(AppError::NotFound(format!(
                "assignment '{principal_id}:{role_id}' was not found"
            )));
        }

        Ok(())
    }
}
