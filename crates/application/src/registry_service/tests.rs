use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gatewarden_core::{AppError, AppResult, Principal, PrincipalId, RoleId};
use gatewarden_domain::{Role, SystemRole};
use tokio::sync::Mutex;

use crate::access_ports::{CreateRoleInput, PrincipalRepository, RolePatch};
use crate::audit_ports::{AuditLogEntry, AuditLogQuery, AuditLogRepository};
use crate::authorization_service::AuthorizationService;
use crate::authorization_service::tests::{
    FakeAccessStore, FakeAuditRepository, action, name, permission, principal_with_roles, resource,
};

use super::RoleRegistryService;

#[derive(Default)]
struct FakePrincipalDirectory {
    principals: Mutex<Vec<Principal>>,
    assignments: Mutex<Vec<(PrincipalId, RoleId)>>,
}

#[async_trait]
impl PrincipalRepository for FakePrincipalDirectory {
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>> {
        Ok(self
            .principals
            .lock()
            .await
            .iter()
            .find(|principal| principal.id() == id)
            .cloned())
    }

    async fn list_principals(&self) -> AppResult<Vec<Principal>> {
        Ok(self.principals.lock().await.clone())
    }

    async fn count_holding_role(&self, role_id: RoleId) -> AppResult<u64> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|(_, assigned)| assigned == &role_id)
            .count() as u64)
    }

    async fn assign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        if !assignments.contains(&(principal_id, role_id)) {
            assignments.push((principal_id, role_id));
        }
        Ok(())
    }

    async fn unassign_role(&self, principal_id: PrincipalId, role_id: RoleId) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        let before = assignments.len();
        assignments.retain(|entry| entry != &(principal_id, role_id));
        if assignments.len() == before {
            return Err(AppError::NotFound(format!(
                "assignment '{principal_id}:{role_id}' was not found"
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeAuditLogRepository {
    entries: Vec<AuditLogEntry>,
}

#[async_trait]
impl AuditLogRepository for FakeAuditLogRepository {
    async fn list_recent_entries(&self, _query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self.entries.clone())
    }
}

struct Fixture {
    service: RoleRegistryService,
    authorization: AuthorizationService,
    store: Arc<FakeAccessStore>,
    directory: Arc<FakePrincipalDirectory>,
    audit: Arc<FakeAuditRepository>,
    manager: Principal,
}

/// Builds a registry whose catalog holds the management capabilities and
/// an "Ops" role granting them to the acting principal.
fn fixture() -> Fixture {
    let management = vec![
        permission("security.role", "read"),
        permission("security.role", "manage"),
        permission("security.audit", "read"),
        permission("bookings", "read"),
        permission("bookings", "write"),
        permission("finance", "export"),
    ];
    let ops_role = Role::custom(
        name("Ops"),
        None,
        management
            .iter()
            .take(3)
            .map(|permission| permission.id)
            .collect(),
    );

    let store = Arc::new(FakeAccessStore::new(vec![ops_role], management));
    let directory = Arc::new(FakePrincipalDirectory::default());
    let audit = Arc::new(FakeAuditRepository::default());
    let authorization =
        AuthorizationService::new(store.clone(), store.clone(), audit.clone());
    let service = RoleRegistryService::new(
        authorization.clone(),
        store.clone(),
        directory.clone(),
        store.clone(),
        audit.clone(),
        Arc::new(FakeAuditLogRepository::default()),
    );

    Fixture {
        service,
        authorization,
        store,
        directory,
        audit,
        manager: principal_with_roles(&["Ops"]),
    }
}

fn create_input(role_name: &str, permission_ids: Vec<gatewarden_core::PermissionId>) -> CreateRoleInput {
    CreateRoleInput {
        name: name(role_name),
        description: None,
        permission_ids,
    }
}

async fn stored_permission_id(
    store: &FakeAccessStore,
    res: &str,
    act: &str,
) -> gatewarden_core::PermissionId {
    let permissions = store.permissions.lock().await;
    match permissions
        .iter()
        .find(|permission| permission.resource.as_str() == res && permission.action.as_str() == act)
    {
        Some(permission) => permission.id,
        None => panic!("fixture catalog is missing '{res}.{act}'"),
    }
}

#[tokio::test]
async fn create_role_requires_manage_capability() {
    let fixture = fixture();
    let outsider = principal_with_roles(&["Support"]);

    let result = fixture
        .service
        .create_role(&outsider, create_input("analysts", Vec::new()))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn create_role_rejects_duplicate_name() {
    let fixture = fixture();

    let first = fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await;
    assert!(first.is_ok());

    let second = fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn create_role_rejects_unresolved_permission_ids() {
    let fixture = fixture();
    let unknown = gatewarden_core::PermissionId::new();

    let result = fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", vec![unknown]))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn create_role_rejects_reserved_system_names() {
    let fixture = fixture();

    let result = fixture
        .service
        .create_role(&fixture.manager, create_input("SuperAdmin", Vec::new()))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn create_role_writes_audit_event() {
    let fixture = fixture();

    let result = fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await;
    assert!(result.is_ok());

    let events = fixture.audit.events.lock().await;
    assert!(
        events
            .iter()
            .any(|event| event.action == gatewarden_domain::AuditAction::RoleCreated)
    );
}

#[tokio::test]
async fn system_role_cannot_be_renamed() {
    let fixture = fixture();
    let now = Utc::now();
    let finance = Role {
        id: RoleId::new(),
        name: name(SystemRole::Finance.as_str()),
        description: None,
        is_system: true,
        permission_ids: Default::default(),
        created_at: now,
        updated_at: now,
    };
    let finance_id = finance.id;
    fixture.store.roles.lock().await.push(finance);

    let result = fixture
        .service
        .update_role(
            &fixture.manager,
            finance_id,
            RolePatch {
                name: Some(name("Treasury")),
                ..RolePatch::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn system_role_keeps_baseline_grants() {
    let fixture = fixture();
    let export_id = stored_permission_id(&fixture.store, "finance", "export").await;
    let bookings_id = stored_permission_id(&fixture.store, "bookings", "read").await;

    let now = Utc::now();
    let finance = Role {
        id: RoleId::new(),
        name: name(SystemRole::Finance.as_str()),
        description: None,
        is_system: true,
        permission_ids: [export_id, bookings_id].into_iter().collect(),
        created_at: now,
        updated_at: now,
    };
    let finance_id = finance.id;
    fixture.store.roles.lock().await.push(finance);

    // Dropping the baseline 'finance.export' grant is rejected.
    let stripped = fixture
        .service
        .assign_permissions(&fixture.manager, finance_id, vec![bookings_id])
        .await;
    assert!(matches!(stripped, Err(AppError::Forbidden(_))));

    // The same strip on a custom role succeeds.
    let custom = match fixture
        .service
        .create_role(
            &fixture.manager,
            create_input("reporting", vec![export_id, bookings_id]),
        )
        .await
    {
        Ok(role) => role,
        Err(error) => panic!("fixture role creation failed: {error}"),
    };
    let narrowed = fixture
        .service
        .assign_permissions(&fixture.manager, custom.id, vec![bookings_id])
        .await;
    assert!(narrowed.is_ok());
}

#[tokio::test]
async fn delete_role_conflicts_while_assigned() {
    let fixture = fixture();
    let role = match fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await
    {
        Ok(role) => role,
        Err(error) => panic!("fixture role creation failed: {error}"),
    };

    let holder = principal_with_roles(&["analysts"]);
    fixture.directory.principals.lock().await.push(holder.clone());
    let assigned = fixture
        .service
        .assign_role(&fixture.manager, holder.id(), "analysts")
        .await;
    assert!(assigned.is_ok());

    let blocked = fixture.service.delete_role(&fixture.manager, role.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    let released = fixture
        .service
        .unassign_role(&fixture.manager, holder.id(), "analysts")
        .await;
    assert!(released.is_ok());

    let deleted = fixture.service.delete_role(&fixture.manager, role.id).await;
    assert!(deleted.is_ok());
}

#[tokio::test]
async fn assign_role_rejects_unknown_principal() {
    let fixture = fixture();
    let role = fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await;
    assert!(role.is_ok());

    let result = fixture
        .service
        .assign_role(&fixture.manager, PrincipalId::new(), "analysts")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn assigned_permission_is_visible_to_checks_immediately() {
    let fixture = fixture();
    let export_id = stored_permission_id(&fixture.store, "finance", "export").await;
    let analyst_role = match fixture
        .service
        .create_role(&fixture.manager, create_input("analysts", Vec::new()))
        .await
    {
        Ok(role) => role,
        Err(error) => panic!("fixture role creation failed: {error}"),
    };
    let analyst = principal_with_roles(&["analysts"]);

    // Warm the projection cache with the empty grant set.
    assert!(matches!(
        fixture
            .authorization
            .can(&analyst, &resource("finance"), &action("export"))
            .await,
        Ok(false)
    ));

    let assigned = fixture
        .service
        .assign_permissions(&fixture.manager, analyst_role.id, vec![export_id])
        .await;
    assert!(assigned.is_ok());

    // The acknowledged write is visible without any cache lag.
    assert!(matches!(
        fixture
            .authorization
            .can(&analyst, &resource("finance"), &action("export"))
            .await,
        Ok(true)
    ));
}

#[tokio::test]
async fn list_audit_log_requires_audit_capability() {
    let fixture = fixture();
    let outsider = principal_with_roles(&["Support"]);

    let result = fixture
        .service
        .list_audit_log(
            &outsider,
            AuditLogQuery {
                limit: 20,
                offset: 0,
                action: None,
                subject: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
