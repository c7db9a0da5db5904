use axum::Json;
use axum::extract::{Extension, State};
use gatewarden_core::Principal;
use gatewarden_domain::{ActionName, ResourceName};

use crate::dto::{AccessCheckRequest, AccessCheckResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Decides a capability check for the calling principal.
///
/// Advisory: the UI uses this for conditional rendering, while the
/// services enforce the same decision on every mutation.
pub async fn check_access_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<AccessCheckRequest>,
) -> ApiResult<Json<AccessCheckResponse>> {
    let resource = ResourceName::new(payload.resource)?;
    let action = ActionName::new(payload.action)?;

    let decision = state
        .authorization_service
        .decide(&principal, &resource, &action)
        .await?;

    Ok(Json(AccessCheckResponse::from(decision)))
}
