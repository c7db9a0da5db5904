use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .registry_service
        .list_roles(&actor)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(role_id): Path<uuid::Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .registry_service
        .get_role(&actor, RoleId::from_uuid(role_id))
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .registry_service
        .create_role(
            &actor,
            gatewarden_application::CreateRoleInput {
                name: RoleName::new(payload.name)?,
                description: payload.description,
                permission_ids: parse_permission_ids(&payload.permission_ids)?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(role_id): Path<uuid::Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let patch = gatewarden_application::RolePatch {
        name: payload.name.map(RoleName::new).transpose()?,
        description: payload.description,
        permission_ids: payload
            .permission_ids
            .as_deref()
            .map(parse_permission_ids)
            .transpose()?,
    };

    let role = state
        .registry_service
        .update_role(&actor, RoleId::from_uuid(role_id), patch)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(role_id): Path<uuid::Uuid>,
) -> ApiResult<StatusCode> {
    state
        .registry_service
        .delete_role(&actor, RoleId::from_uuid(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(role_id): Path<uuid::Uuid>,
    Json(payload): Json<AssignPermissionsRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .registry_service
        .assign_permissions(
            &actor,
            RoleId::from_uuid(role_id),
            parse_permission_ids(&payload.permission_ids)?,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}
