//! Role API handlers.
//!
//! # Purpose
//! Implements the roles screens: paginated listing, edit-form payloads with
//! the permission catalog, and create/update/delete with atomic permission
//! sync. The whole resource is gated the way the original route middleware
//! did it: holding any `roles.*` permission opens every role route.
use crate::api::error::{ApiError, api_internal, map_store_error};
use crate::api::types::{
    CreateRoleRequest, ListQueryParams, RoleFormResponse, RoleListResponse, UpdateRoleRequest,
};
use crate::api::validation::FieldErrors;
use crate::app::AppState;
use crate::auth::guard::require_any;
use crate::auth::rbac;
use crate::model::RoleWithPermissions;
use crate::store::{ListParams, NewRole, ROLE_LISTING, RoleUpdate};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "roles",
    params(ListQueryParams),
    responses(
        (status = 200, description = "Paginated roles", body = RoleListResponse),
        (status = 403, description = "Missing permission", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQueryParams>,
) -> Result<Json<RoleListResponse>, ApiError> {
    require_any(&state, &headers, rbac::ROLES_RESOURCE).await?;
    let params = sanitize(&query);
    let page = state
        .store
        .list_roles(&params)
        .await
        .map_err(|err| api_internal("failed to list roles", &err))?;
    Ok(Json(RoleListResponse::new(page, &params)))
}

#[utoipa::path(
    get,
    path = "/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role with permission catalog", body = RoleFormResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn get_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleFormResponse>, ApiError> {
    require_any(&state, &headers, rbac::ROLES_RESOURCE).await?;
    let role = state
        .store
        .get_role(id)
        .await
        .map_err(|err| map_store_error(err, "role", "failed to load role"))?;
    let permissions = state
        .store
        .all_permissions()
        .await
        .map_err(|err| api_internal("failed to load permissions", &err))?;
    Ok(Json(RoleFormResponse { role, permissions }))
}

#[utoipa::path(
    post,
    path = "/v1/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleWithPermissions),
        (status = 409, description = "Role name already taken", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = require_any(&state, &headers, rbac::ROLES_RESOURCE).await?;

    let mut errors = FieldErrors::new();
    errors.require("name", &body.name);
    if body.permissions.is_empty() {
        errors.push("permissions", "the permissions field is required");
    }
    errors.into_result()?;

    let created = state
        .store
        .create_role(NewRole {
            name: body.name.trim().to_string(),
            permission_ids: body.permissions,
            actor: current.user.id,
        })
        .await
        .map_err(|err| map_store_error(err, "role", "failed to create role"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated, permission set replaced", body = RoleWithPermissions),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<RoleWithPermissions>, ApiError> {
    let current = require_any(&state, &headers, rbac::ROLES_RESOURCE).await?;

    let mut errors = FieldErrors::new();
    errors.require("name", &body.name);
    if body.permissions.is_empty() {
        errors.push("permissions", "the permissions field is required");
    }
    errors.into_result()?;

    let updated = state
        .store
        .update_role(
            id,
            RoleUpdate {
                name: body.name.trim().to_string(),
                permission_ids: body.permissions,
                actor: current.user.id,
            },
        )
        .await
        .map_err(|err| map_store_error(err, "role", "failed to update role"))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn delete_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_any(&state, &headers, rbac::ROLES_RESOURCE).await?;
    state
        .store
        .delete_role(id)
        .await
        .map_err(|err| map_store_error(err, "role", "failed to delete role"))?;
    Ok(StatusCode::NO_CONTENT)
}

fn sanitize(query: &ListQueryParams) -> ListParams {
    ListParams::sanitize(
        &ROLE_LISTING,
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.sort_dir.as_deref(),
        query.search.as_deref(),
    )
}
