use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use gatewarden_core::{AppError, Principal, PrincipalId, PrincipalStatus};

use crate::error::ApiResult;
use crate::state::AppState;

/// Header the upstream identity proxy fills with the principal id.
pub const PRINCIPAL_HEADER: &str = "x-authenticated-principal";

fn unauthenticated() -> AppError {
    AppError::Unauthenticated("no valid principal".to_owned())
}

/// Resolves the authenticated principal and injects it as an extension.
///
/// The proxy header is the trust boundary: requests without a resolvable
/// header never reach protected handlers, and responses carry only the
/// error category.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let header_value = request
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(unauthenticated)?;

    let principal_id = uuid::Uuid::parse_str(header_value)
        .map(PrincipalId::from_uuid)
        .map_err(|_| unauthenticated())?;

    let principal = state
        .principal_repository
        .find_principal(principal_id)
        .await?
        .ok_or_else(unauthenticated)?;

    match principal.status() {
        PrincipalStatus::Active => {}
        PrincipalStatus::Suspended | PrincipalStatus::Pending => {
            return Err(AppError::Forbidden("account is not active".to_owned()).into());
        }
        PrincipalStatus::Deleted => return Err(unauthenticated().into()),
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Literal role-name allow-list for coarse route guarding.
#[derive(Debug, Clone, Copy)]
pub struct RequiredRoles(pub &'static [&'static str]);

/// Rejects principals holding none of the allow-listed role names.
///
/// Runs after [`require_principal`]; the fine-grained capability checks
/// stay in the services.
pub async fn require_role(request: Request, next: Next) -> ApiResult<Response> {
    let required = request
        .extensions()
        .get::<RequiredRoles>()
        .copied()
        .ok_or_else(|| AppError::Internal("required roles are not configured".to_owned()))?;

    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(unauthenticated)?;

    if !required.0.iter().any(|role| principal.holds_role(role)) {
        return Err(AppError::Forbidden("insufficient role".to_owned()).into());
    }

    Ok(next.run(request).await)
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site") {
            if fetch_site == HeaderValue::from_static("cross-site") {
                return Err(
                    AppError::Unauthenticated("cross-site request blocked".to_owned()).into(),
                );
            }
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let allowed_origin = state.frontend_url;
        let origin_is_allowed = origin == allowed_origin;
        let referer_is_allowed = referer.starts_with(&allowed_origin);

        if !origin_is_allowed && !referer_is_allowed {
            return Err(AppError::Unauthenticated("origin validation failed".to_owned()).into());
        }
    }

    Ok(next.run(request).await)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
