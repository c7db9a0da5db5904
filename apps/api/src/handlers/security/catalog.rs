use super::*;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .catalog_service
        .list_permissions()
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn list_permission_groups_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionGroupResponse>>> {
    let groups = state
        .catalog_service
        .permission_groups()
        .await?
        .into_iter()
        .map(PermissionGroupResponse::from)
        .collect();

    Ok(Json(groups))
}
