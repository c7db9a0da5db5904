use std::sync::Arc;

use gatewarden_application::{
    AuthorizationService, PermissionCatalogService, PrincipalRepository, RoleRegistryService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: PermissionCatalogService,
    pub registry_service: RoleRegistryService,
    pub authorization_service: AuthorizationService,
    pub principal_repository: Arc<dyn PrincipalRepository>,
    pub frontend_url: String,
}
