use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use gatewarden_core::{AppError, AppResult, Principal};
use gatewarden_domain::{
    AccessSnapshot, ActionName, AuditAction, Decision, ResourceName, evaluate,
};
use tokio::sync::RwLock;

use crate::access_ports::{PermissionRepository, RoleRepository};
use crate::audit_ports::{AuditEvent, AuditRepository};

type GrantSet = BTreeSet<(ResourceName, ActionName)>;

/// Role-projection cache with an invalidation epoch.
///
/// The epoch lets in-flight resolutions detect an invalidation that ran
/// while they were reading the repositories: a projection resolved under
/// an older epoch must not be cached, or it would pin pre-write grants
/// past an acknowledged mutation.
#[derive(Default)]
struct ProjectionCache {
    epoch: u64,
    roles: HashMap<String, Arc<GrantSet>>,
}

/// Application service deciding whether a principal may perform an action
/// on a resource.
///
/// Decisions themselves are the pure [`evaluate`] function over an
/// immutable snapshot; this service owns the role-projection cache the
/// snapshots are built from. Registry mutations invalidate the cache
/// synchronously, so an acknowledged write is visible to every
/// subsequent decision.
#[derive(Clone)]
pub struct AuthorizationService {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    projections: Arc<RwLock<ProjectionCache>>,
}

impl AuthorizationService {
    /// Creates a new authorization service over role and catalog ports.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            roles,
            permissions,
            audit_repository,
            projections: Arc::new(RwLock::new(ProjectionCache::default())),
        }
    }

    /// Returns whether the principal currently has the capability.
    pub async fn can(
        &self,
        principal: &Principal,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<bool> {
        Ok(self.decide(principal, resource, action).await?.is_granted())
    }

    /// Decides the capability check and returns the full decision.
    pub async fn decide(
        &self,
        principal: &Principal,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<Decision> {
        let snapshot = self.snapshot_for(principal.roles()).await?;
        Ok(evaluate(&snapshot, principal.roles(), resource, action))
    }

    /// Ensures the principal has the capability.
    ///
    /// The enforcing form: denials fail with `Forbidden` and are appended
    /// to the audit trail, and grants through the wildcard rule are
    /// audited so the bypass stays visible.
    pub async fn require(
        &self,
        principal: &Principal,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<()> {
        match self.decide(principal, resource, action).await? {
            decision @ Decision::Granted { .. } if decision.is_wildcard() => {
                self.audit_repository
                    .append_event(AuditEvent {
                        subject: principal.id().to_string(),
                        action: AuditAction::WildcardAccessUsed,
                        resource_type: "capability".to_owned(),
                        resource_id: format!("{resource}.{action}"),
                        detail: Some(format!(
                            "wildcard role satisfied capability '{resource}.{action}'"
                        )),
                    })
                    .await
            }
            Decision::Granted { .. } => Ok(()),
            Decision::Denied { .. } => {
                self.audit_repository
                    .append_event(AuditEvent {
                        subject: principal.id().to_string(),
                        action: AuditAction::AccessDenied,
                        resource_type: "capability".to_owned(),
                        resource_id: format!("{resource}.{action}"),
                        detail: None,
                    })
                    .await?;

                Err(AppError::Forbidden(format!(
                    "principal '{}' is missing capability '{resource}.{action}'",
                    principal.id()
                )))
            }
        }
    }

    /// Drops the cached projection of one role.
    pub async fn invalidate_role(&self, role_name: &str) {
        let mut cache = self.projections.write().await;
        cache.roles.remove(role_name);
        cache.epoch += 1;
    }

    /// Drops every cached projection.
    pub async fn invalidate_all(&self) {
        let mut cache = self.projections.write().await;
        cache.roles.clear();
        cache.epoch += 1;
    }

    /// Builds an immutable snapshot covering the requested roles.
    ///
    /// Cached projections are reused; missing ones are resolved from the
    /// repositories and cached, unless an invalidation raced the
    /// resolution. Roles unknown to the registry project an empty grant
    /// set.
    async fn snapshot_for(&self, role_names: &BTreeSet<String>) -> AppResult<AccessSnapshot> {
        let mut snapshot = AccessSnapshot::new();
        let mut missing = Vec::new();

        let read_epoch = {
            let cache = self.projections.read().await;
            for name in role_names {
                match cache.roles.get(name) {
                    Some(grants) => snapshot.insert_role(name.clone(), grants.as_ref().clone()),
                    None => missing.push(name.clone()),
                }
            }
            cache.epoch
        };

        for name in missing {
            let grants = Arc::new(self.resolve_role_grants(name.as_str()).await?);
            snapshot.insert_role(name.clone(), grants.as_ref().clone());

            let mut cache = self.projections.write().await;
            // Cache only when no invalidation ran mid-resolution; a
            // projection read under an older epoch may predate an
            // acknowledged write and is served for this decision only.
            if cache.epoch == read_epoch {
                cache.roles.insert(name, grants);
            }
        }

        Ok(snapshot)
    }

    async fn resolve_role_grants(&self, role_name: &str) -> AppResult<GrantSet> {
        let Some(role) = self.roles.find_role_by_name(role_name).await? else {
            return Ok(GrantSet::new());
        };

        let ids: Vec<_> = role.permission_ids.iter().copied().collect();
        let permissions = self.permissions.find_permissions(&ids).await?;

        Ok(permissions
            .into_iter()
            .map(|permission| (permission.resource, permission.action))
            .collect())
    }
}
