use super::*;

use gatewarden_core::PrincipalId;

impl RoleRegistryService {
    /// Returns all principals with their current role assignments.
    pub async fn list_principals(&self, actor: &Principal) -> AppResult<Vec<Principal>> {
        self.require_role_read(actor).await?;
        self.principals.list_principals().await
    }

    /// Assigns a role to a principal and emits an audit event.
    pub async fn assign_role(
        &self,
        actor: &Principal,
        principal_id: PrincipalId,
        role_name: &str,
    ) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let role = self
            .roles
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' was not found")))?;

        self.principals
            .find_principal(principal_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("principal '{principal_id}' was not found"))
            })?;

        self.principals.assign_role(principal_id, role.id).await?;

        self.append_assignment_event(
            actor,
            AuditAction::RoleAssigned,
            principal_id,
            role_name,
            format!("assigned role '{role_name}' to '{principal_id}'"),
        )
        .await
    }

    /// Removes a role assignment from a principal and emits an audit
    /// event.
    pub async fn unassign_role(
        &self,
        actor: &Principal,
        principal_id: PrincipalId,
        role_name: &str,
    ) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let role = self
            .roles
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' was not found")))?;

        self.principals.unassign_role(principal_id, role.id).await?;

        self.append_assignment_event(
            actor,
            AuditAction::RoleUnassigned,
            principal_id,
            role_name,
            format!("removed role '{role_name}' from '{principal_id}'"),
        )
        .await
    }

    async fn append_assignment_event(
        &self,
        actor: &Principal,
        action: AuditAction,
        principal_id: PrincipalId,
        role_name: &str,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.id().to_string(),
                action,
                resource_type: "principal_role".to_owned(),
                resource_id: format!("{principal_id}:{role_name}"),
                detail: Some(detail),
            })
            .await
    }
}
