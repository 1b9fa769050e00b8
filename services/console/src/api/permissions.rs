//! Permission API handlers.
//!
//! # Purpose
//! Implements the permissions screen: paginated listing plus CRUD on the
//! dot-namespaced permission names the route guards check against.
use crate::api::error::{ApiError, api_internal, map_store_error};
use crate::api::types::{
    CreatePermissionRequest, ListQueryParams, PermissionListResponse, UpdatePermissionRequest,
};
use crate::api::validation::FieldErrors;
use crate::app::AppState;
use crate::auth::guard::require_any;
use crate::auth::rbac;
use crate::model::Permission;
use crate::store::{ListParams, NewPermission, PERMISSION_LISTING, PermissionUpdate};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/permissions",
    tag = "permissions",
    params(ListQueryParams),
    responses(
        (status = 200, description = "Paginated permissions", body = PermissionListResponse),
        (status = 403, description = "Missing permission", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQueryParams>,
) -> Result<Json<PermissionListResponse>, ApiError> {
    require_any(&state, &headers, &[rbac::PERMISSIONS_INDEX]).await?;
    let params = sanitize(&query);
    let page = state
        .store
        .list_permissions(&params)
        .await
        .map_err(|err| api_internal("failed to list permissions", &err))?;
    Ok(Json(PermissionListResponse::new(page, &params)))
}

#[utoipa::path(
    post,
    path = "/v1/permissions",
    tag = "permissions",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 409, description = "Name already taken", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn create_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = require_any(&state, &headers, &[rbac::PERMISSIONS_CREATE]).await?;
    validate_name(&body.name)?;

    let created = state
        .store
        .create_permission(NewPermission {
            name: body.name.trim().to_string(),
            actor: Some(current.user.id),
        })
        .await
        .map_err(|err| map_store_error(err, "permission", "failed to create permission"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/v1/permissions/{id}",
    tag = "permissions",
    params(("id" = Uuid, Path, description = "Permission id")),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Permission updated", body = Permission),
        (status = 404, description = "Permission not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn update_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePermissionRequest>,
) -> Result<Json<Permission>, ApiError> {
    let current = require_any(&state, &headers, &[rbac::PERMISSIONS_EDIT]).await?;
    validate_name(&body.name)?;

    let updated = state
        .store
        .update_permission(
            id,
            PermissionUpdate {
                name: body.name.trim().to_string(),
                actor: current.user.id,
            },
        )
        .await
        .map_err(|err| map_store_error(err, "permission", "failed to update permission"))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/v1/permissions/{id}",
    tag = "permissions",
    params(("id" = Uuid, Path, description = "Permission id")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 404, description = "Permission not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn delete_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_any(&state, &headers, &[rbac::PERMISSIONS_DELETE]).await?;
    state
        .store
        .delete_permission(id)
        .await
        .map_err(|err| map_store_error(err, "permission", "failed to delete permission"))?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    errors.require("name", name);
    if !name.trim().is_empty() && !rbac::is_valid_name(name.trim()) {
        errors.push(
            "name",
            "the name must be dot-namespaced, e.g. `reports.view`",
        );
    }
    errors.into_result()
}

fn sanitize(query: &ListQueryParams) -> ListParams {
    ListParams::sanitize(
        &PERMISSION_LISTING,
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.sort_dir.as_deref(),
        query.search.as_deref(),
    )
}
