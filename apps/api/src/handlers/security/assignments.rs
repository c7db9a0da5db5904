use super::*;

pub async fn list_principals_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<Vec<PrincipalResponse>>> {
    let principals = state
        .registry_service
        .list_principals(&actor)
        .await?
        .into_iter()
        .map(PrincipalResponse::from)
        .collect();

    Ok(Json(principals))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let principal_id = parse_principal_id(payload.principal_id.as_str())?;

    state
        .registry_service
        .assign_role(&actor, principal_id, payload.role_name.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(payload): Json<RemoveRoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    let principal_id = parse_principal_id(payload.principal_id.as_str())?;

    state
        .registry_service
        .unassign_role(&actor, principal_id, payload.role_name.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
