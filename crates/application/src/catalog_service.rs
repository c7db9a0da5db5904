use std::sync::Arc;

use gatewarden_core::{AppError, AppResult};
use gatewarden_domain::{
    ActionName, AuditAction, Permission, PermissionGroup, ResourceName, seed_catalog,
};

use crate::access_ports::PermissionRepository;
use crate::audit_ports::{AuditEvent, AuditRepository};

/// Subject recorded for bootstrap writes that have no acting principal.
pub const SYSTEM_SUBJECT: &str = "system";

/// Application service over the permission catalog.
///
/// The catalog is read-mostly: entries are seeded at bootstrap and the
/// derived group view is computed, never persisted.
#[derive(Clone)]
pub struct PermissionCatalogService {
    repository: Arc<dyn PermissionRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl PermissionCatalogService {
    /// Creates a new catalog service from a repository implementation.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Lists the catalog ordered by resource, then action.
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.repository.list_permissions().await
    }

    /// Finds a catalog permission by its `(resource, action)` pair.
    pub async fn find_by_resource_action(
        &self,
        resource: &ResourceName,
        action: &ActionName,
    ) -> AppResult<Permission> {
        self.repository
            .find_by_resource_action(resource, action)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission '{resource}.{action}' is not in the catalog"
                ))
            })
    }

    /// Returns the derived presentation view grouping the catalog by
    /// resource.
    pub async fn permission_groups(&self) -> AppResult<Vec<PermissionGroup>> {
        let permissions = self.repository.list_permissions().await?;
        Ok(PermissionGroup::group(permissions))
    }

    /// Seeds the static catalog, inserting pairs not yet present.
    ///
    /// Idempotent; emits one audit event when at least one entry was
    /// inserted.
    pub async fn seed(&self) -> AppResult<u64> {
        let mut entries = Vec::new();
        for seed in seed_catalog() {
            let resource = ResourceName::new(seed.resource)?;
            let action = ActionName::new(seed.action)?;
            entries.push(Permission::new(
                resource,
                action,
                Some(seed.description.to_owned()),
            ));
        }

        let inserted = self.repository.insert_missing(entries).await?;

        if inserted > 0 {
            self.audit_repository
                .append_event(AuditEvent {
                    subject: SYSTEM_SUBJECT.to_owned(),
                    action: AuditAction::PermissionCatalogSeeded,
                    resource_type: "permission_catalog".to_owned(),
                    resource_id: "seed".to_owned(),
                    detail: Some(format!("seeded {inserted} catalog entries")),
                })
                .await?;
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gatewarden_core::AppError;

    use crate::authorization_service::tests::{
        FakeAccessStore, FakeAuditRepository, action, resource,
    };

    use super::PermissionCatalogService;

    fn service() -> (PermissionCatalogService, Arc<FakeAuditRepository>) {
        let store = Arc::new(FakeAccessStore::new(Vec::new(), Vec::new()));
        let audit = Arc::new(FakeAuditRepository::default());
        (PermissionCatalogService::new(store, audit.clone()), audit)
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (service, audit) = service();

        let first = service.seed().await;
        assert!(matches!(first, Ok(count) if count > 0));

        let second = service.seed().await;
        assert!(matches!(second, Ok(0)));

        // Only the first run audits.
        assert_eq!(audit.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn lookup_of_unseeded_pair_is_not_found() {
        let (service, _) = service();
        let result = service
            .find_by_resource_action(&resource("bookings"), &action("read"))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn groups_follow_catalog_order() {
        let (service, _) = service();
        assert!(service.seed().await.is_ok());

        let groups = match service.permission_groups().await {
            Ok(groups) => groups,
            Err(error) => panic!("grouping failed: {error}"),
        };
        assert!(!groups.is_empty());

        let resources: Vec<_> = groups
            .iter()
            .map(|group| group.resource.as_str().to_owned())
            .collect();
        let mut sorted = resources.clone();
        sorted.sort();
        assert_eq!(resources, sorted);
    }
}
