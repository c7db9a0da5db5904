use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use gatewarden_core::{AppError, AppResult, PermissionId, Principal, RoleId};
use gatewarden_domain::{ActionName, AuditAction, ResourceName, Role, SystemRole};

use crate::access_ports::{
    CreateRoleInput, PermissionRepository, PrincipalRepository, RolePatch, RoleRepository,
};
use crate::audit_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use crate::authorization_service::AuthorizationService;

mod assignments;
#[cfg(test)]
mod tests;

/// Application service for role administration.
///
/// Every mutation authorizes the acting principal, persists through the
/// repository, invalidates the evaluator's projection cache before
/// returning, and appends an audit event.
#[derive(Clone)]
pub struct RoleRegistryService {
    authorization_service: AuthorizationService,
    roles: Arc<dyn RoleRepository>,
    principals: Arc<dyn PrincipalRepository>,
    permissions: Arc<dyn PermissionRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
}

impl RoleRegistryService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        roles: Arc<dyn RoleRepository>,
        principals: Arc<dyn PrincipalRepository>,
        permissions: Arc<dyn PermissionRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
    ) -> Self {
        Self {
            authorization_service,
            roles,
            principals,
            permissions,
            audit_repository,
            audit_log_repository,
        }
    }

    /// Returns all roles for administrative users.
    pub async fn list_roles(&self, actor: &Principal) -> AppResult<Vec<Role>> {
        self.require_role_read(actor).await?;
        self.roles.list_roles().await
    }

    /// Returns one role by id.
    pub async fn get_role(&self, actor: &Principal, id: RoleId) -> AppResult<Role> {
        self.require_role_read(actor).await?;
        self.roles
            .find_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{id}' was not found")))
    }

    /// Creates a custom role and emits an audit event.
    pub async fn create_role(&self, actor: &Principal, input: CreateRoleInput) -> AppResult<Role> {
        self.require_role_manage(actor).await?;

        if SystemRole::from_name(input.name.as_str()).is_some() {
            return Err(AppError::Conflict(format!(
                "role name '{}' is reserved for a system role",
                input.name
            )));
        }

        let permission_ids = self.resolve_permission_ids(&input.permission_ids).await?;
        let role = Role::custom(input.name, input.description, permission_ids);

        self.roles.insert_role(role.clone()).await?;
        self.authorization_service
            .invalidate_role(role.name.as_str())
            .await;

        self.append_role_event(
            actor,
            AuditAction::RoleCreated,
            &role,
            format!("created role '{}'", role.name),
        )
        .await?;

        Ok(role)
    }

    /// Applies a partial update to a role and emits an audit event.
    ///
    /// System roles cannot be renamed and must keep their baseline
    /// grants.
    pub async fn update_role(
        &self,
        actor: &Principal,
        id: RoleId,
        patch: RolePatch,
    ) -> AppResult<Role> {
        self.require_role_manage(actor).await?;

        let mut role = self
            .roles
            .find_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{id}' was not found")))?;
        let previous_name = role.name.clone();

        if let Some(name) = patch.name {
            if role.is_system && name != role.name {
                return Err(AppError::Forbidden(format!(
                    "system role '{}' cannot be renamed",
                    role.name
                )));
            }
            role.name = name;
        }

        if let Some(description) = patch.description {
            role.description = Some(description);
        }

        if let Some(permission_ids) = patch.permission_ids {
            let permission_ids = self.resolve_permission_ids(&permission_ids).await?;
            self.ensure_system_baseline(&role, &permission_ids).await?;
            role.permission_ids = permission_ids;
        }

        role.updated_at = Utc::now();
        self.roles.update_role(role.clone()).await?;
        self.authorization_service
            .invalidate_role(previous_name.as_str())
            .await;
        self.authorization_service
            .invalidate_role(role.name.as_str())
            .await;

        self.append_role_event(
            actor,
            AuditAction::RoleUpdated,
            &role,
            format!("updated role '{}'", role.name),
        )
        .await?;

        Ok(role)
    }

    /// Deletes a role that no principal currently holds.
    pub async fn delete_role(&self, actor: &Principal, id: RoleId) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let role = self
            .roles
            .find_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{id}' was not found")))?;

        if role.is_system {
            return Err(AppError::Forbidden(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        let holders = self.principals.count_holding_role(id).await?;
        if holders > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is still assigned to {holders} principal(s)",
                role.name
            )));
        }

        self.roles.delete_role(id).await?;
        self.authorization_service
            .invalidate_role(role.name.as_str())
            .await;

        self.append_role_event(
            actor,
            AuditAction::RoleDeleted,
            &role,
            format!("deleted role '{}'", role.name),
        )
        .await
    }

    /// Replaces a role's permission set and emits an audit event.
    pub async fn assign_permissions(
        &self,
        actor: &Principal,
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    ) -> AppResult<Role> {
        self.require_role_manage(actor).await?;

        let mut role = self
            .roles
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        let permission_ids = self.resolve_permission_ids(&permission_ids).await?;
        self.ensure_system_baseline(&role, &permission_ids).await?;

        role.permission_ids = permission_ids;
        role.updated_at = Utc::now();

        self.roles.update_role(role.clone()).await?;
        self.authorization_service
            .invalidate_role(role.name.as_str())
            .await;

        self.append_role_event(
            actor,
            AuditAction::RolePermissionsAssigned,
            &role,
            format!(
                "assigned {} permission(s) to role '{}'",
                role.permission_ids.len(),
                role.name
            ),
        )
        .await?;

        Ok(role)
    }

    /// Returns recent audit entries.
    pub async fn list_audit_log(
        &self,
        actor: &Principal,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.authorization_service
            .require(
                actor,
                &ResourceName::new("security.audit")?,
                &ActionName::new("read")?,
            )
            .await?;

        self.audit_log_repository.list_recent_entries(query).await
    }

    async fn require_role_read(&self, actor: &Principal) -> AppResult<()> {
        self.authorization_service
            .require(
                actor,
                &ResourceName::new("security.role")?,
                &ActionName::new("read")?,
            )
            .await
    }

    async fn require_role_manage(&self, actor: &Principal) -> AppResult<()> {
        self.authorization_service
            .require(
                actor,
                &ResourceName::new("security.role")?,
                &ActionName::new("manage")?,
            )
            .await
    }

    /// Resolves requested permission ids against the catalog.
    ///
    /// Every id must resolve, else the whole request is rejected.
    async fn resolve_permission_ids(
        &self,
        requested: &[PermissionId],
    ) -> AppResult<BTreeSet<PermissionId>> {
        let resolved = self.permissions.find_permissions(requested).await?;
        let resolved_ids: BTreeSet<PermissionId> =
            resolved.iter().map(|permission| permission.id).collect();

        if let Some(unknown) = requested.iter().find(|id| !resolved_ids.contains(id)) {
            return Err(AppError::Validation(format!(
                "permission '{unknown}' does not resolve in the catalog"
            )));
        }

        Ok(requested.iter().copied().collect())
    }

    /// Rejects permission sets that would drop a system role below its
    /// baseline grants.
    async fn ensure_system_baseline(
        &self,
        role: &Role,
        permission_ids: &BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        let Some(system_role) = role.system_role() else {
            return Ok(());
        };

        for (resource, action) in system_role.baseline_grants() {
            let resource = ResourceName::new(*resource)?;
            let action = ActionName::new(*action)?;
            let Some(baseline) = self
                .permissions
                .find_by_resource_action(&resource, &action)
                .await?
            else {
                // Pair not in the catalog; it cannot be granted or lost.
                continue;
            };

            if !permission_ids.contains(&baseline.id) {
                return Err(AppError::Forbidden(format!(
                    "system role '{}' must retain its baseline grant '{resource}.{action}'",
                    role.name
                )));
            }
        }

        Ok(())
    }

    async fn append_role_event(
        &self,
        actor: &Principal,
        action: AuditAction,
        role: &Role,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.id().to_string(),
                action,
                resource_type: "rbac_role".to_owned(),
                resource_id: role.id.to_string(),
                detail: Some(detail),
            })
            .await
    }
}
