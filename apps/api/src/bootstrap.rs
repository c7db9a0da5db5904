//! Startup provisioning of the permission catalog and system roles.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use gatewarden_application::{
    AuditEvent, AuditRepository, PermissionCatalogService, PermissionRepository, RoleRepository,
    SYSTEM_SUBJECT,
};
use gatewarden_core::{AppResult, PermissionId, RoleId};
use gatewarden_domain::{ActionName, AuditAction, ResourceName, Role, RoleName, SystemRole};
use tracing::info;

/// Seeds the permission catalog and ensures every system role exists with
/// at least its baseline grants.
///
/// Idempotent: re-running against a provisioned database changes nothing.
pub async fn provision(
    catalog_service: &PermissionCatalogService,
    roles: &Arc<dyn RoleRepository>,
    permissions: &Arc<dyn PermissionRepository>,
    audit_repository: &Arc<dyn AuditRepository>,
) -> AppResult<()> {
    let seeded = catalog_service.seed().await?;
    if seeded > 0 {
        info!(seeded, "seeded permission catalog");
    }

    for system_role in SystemRole::all() {
        let baseline = baseline_permission_ids(permissions, *system_role).await?;

        match roles.find_role_by_name(system_role.as_str()).await? {
            Some(mut role) => {
                if !baseline.is_subset(&role.permission_ids) {
                    role.permission_ids.extend(baseline);
                    role.updated_at = Utc::now();
                    roles.update_role(role).await?;
                    info!(role = system_role.as_str(), "restored system role baseline grants");
                }
            }
            None => {
                let now = Utc::now();
                let role = Role {
                    id: RoleId::new(),
                    name: RoleName::new(system_role.as_str())?,
                    description: Some("Platform-provisioned system role".to_owned()),
                    is_system: true,
                    permission_ids: baseline,
                    created_at: now,
                    updated_at: now,
                };

                roles.insert_role(role.clone()).await?;
                audit_repository
                    .append_event(AuditEvent {
                        subject: SYSTEM_SUBJECT.to_owned(),
                        action: AuditAction::RoleCreated,
                        resource_type: "rbac_role".to_owned(),
                        resource_id: role.id.to_string(),
                        detail: Some(format!("provisioned system role '{}'", role.name)),
                    })
                    .await?;
                info!(role = system_role.as_str(), "provisioned system role");
            }
        }
    }

    Ok(())
}

/// Resolves a system role's baseline grant pairs against the catalog.
async fn baseline_permission_ids(
    permissions: &Arc<dyn PermissionRepository>,
    system_role: SystemRole,
) -> AppResult<BTreeSet<PermissionId>> {
    let mut ids = BTreeSet::new();
    for (resource, action) in system_role.baseline_grants() {
        let resource = ResourceName::new(*resource)?;
        let action = ActionName::new(*action)?;
        if let Some(permission) = permissions
            .find_by_resource_action(&resource, &action)
            .await?
        {
            ids.insert(permission.id);
        }
    }

    Ok(ids)
}
