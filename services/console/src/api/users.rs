//! User API handlers.
//!
//! # Purpose
//! Implements the users screens: paginated listing (live and trashed),
//! create/edit form payloads, soft delete with restore, and permanent
//! removal. Every route checks its declared permission before touching the
//! store.
use crate::api::error::{ApiError, api_internal, map_store_error};
use crate::api::types::{
    CreateUserRequest, DeleteUserResponse, UpdateUserRequest, UserFormResponse, UserListResponse,
};
use crate::api::validation::{FieldErrors, looks_like_email};
use crate::app::AppState;
use crate::auth::guard::require_any;
use crate::auth::password::hash_password;
use crate::auth::rbac;
use crate::model::UserWithRoles;
use crate::store::{ListParams, NewUser, USER_LISTING, UserUpdate};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

/// Listing query with the users-only `trashed` toggle for the recycle bin.
/// Kept flat (no nested struct) because query-string deserialization cannot
/// see through `serde(flatten)`.
#[derive(Debug, serde::Deserialize, utoipa::IntoParams, Default)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub trashed: bool,
}

#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated users", body = UserListResponse),
        (status = 403, description = "Missing permission", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    require_any(&state, &headers, &[rbac::USERS_INDEX]).await?;
    let params = sanitize(&query);
    let page = state
        .store
        .list_users(&params, query.trashed)
        .await
        .map_err(|err| api_internal("failed to list users", &err))?;
    Ok(Json(UserListResponse::new(page, &params)))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User with role catalog", body = UserFormResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<UserFormResponse>, ApiError> {
    require_any(&state, &headers, &[rbac::USERS_EDIT]).await?;
    let user = state
        .store
        .get_user(id)
        .await
        .map_err(|err| map_store_error(err, "user", "failed to load user"))?;
    let roles = state
        .store
        .all_roles()
        .await
        .map_err(|err| api_internal("failed to load roles", &err))?;
    Ok(Json(UserFormResponse { user, roles }))
}

#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserWithRoles),
        (status = 409, description = "Email already taken", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = require_any(&state, &headers, &[rbac::USERS_CREATE]).await?;

    let mut errors = FieldErrors::new();
    errors.require("name", &body.name);
    errors.require("email", &body.email);
    if !body.email.trim().is_empty() && !looks_like_email(body.email.trim()) {
        errors.push("email", "the email must be a valid email address");
    }
    errors.require("password", &body.password);
    if body.password != body.password_confirmation {
        errors.push("password", "the password confirmation does not match");
    }
    if body.roles.is_empty() {
        errors.push("roles", "the roles field is required");
    }
    errors.into_result()?;

    let password_hash = hash_password(&body.password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        crate::api::error::api_internal_message("failed to hash password")
    })?;

    let created = state
        .store
        .create_user(NewUser {
            name: body.name.trim().to_string(),
            email: body.email.trim().to_string(),
            password_hash,
            role_ids: body.roles,
            actor: Some(current.user.id),
        })
        .await
        .map_err(|err| map_store_error(err, "user", "failed to create user"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserWithRoles),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserWithRoles>, ApiError> {
    let current = require_any(&state, &headers, &[rbac::USERS_EDIT]).await?;

    let mut errors = FieldErrors::new();
    errors.require("name", &body.name);
    errors.require("email", &body.email);
    if !body.email.trim().is_empty() && !looks_like_email(body.email.trim()) {
        errors.push("email", "the email must be a valid email address");
    }
    // Blank password means "keep the current one"; a provided password must
    // still be confirmed.
    let password = body.password.as_deref().filter(|value| !value.is_empty());
    if let Some(password) = password
        && body.password_confirmation.as_deref() != Some(password)
    {
        errors.push("password", "the password confirmation does not match");
    }
    if body.roles.is_empty() {
        errors.push("roles", "the roles field is required");
    }
    errors.into_result()?;

    let password_hash = match password {
        Some(password) => Some(hash_password(password).map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            crate::api::error::api_internal_message("failed to hash password")
        })?),
        None => None,
    };

    let updated = state
        .store
        .update_user(
            id,
            UserUpdate {
                name: body.name.trim().to_string(),
                email: body.email.trim().to_string(),
                password_hash,
                role_ids: body.roles,
                actor: current.user.id,
            },
        )
        .await
        .map_err(|err| map_store_error(err, "user", "failed to update user"))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User soft-deleted", body = DeleteUserResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let current = require_any(&state, &headers, &[rbac::USERS_DELETE]).await?;
    state
        .store
        .soft_delete_user(id, current.user.id)
        .await
        .map_err(|err| map_store_error(err, "user", "failed to delete user"))?;

    // Deleting your own account invalidates the session: the guard refuses
    // soft-deleted subjects, so the client must return to login.
    let redirect = (id == current.user.id).then(|| "login".to_string());
    Ok(Json(DeleteUserResponse {
        status: "deleted".to_string(),
        redirect,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/restore",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User restored", body = UserWithRoles),
        (status = 404, description = "No trashed user with this id", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Email re-taken while trashed", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn restore_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithRoles>, ApiError> {
    let current = require_any(&state, &headers, &[rbac::USERS_RESTORE]).await?;
    state
        .store
        .restore_user(id, current.user.id)
        .await
        .map_err(|err| map_store_error(err, "user", "failed to restore user"))?;
    let restored = state
        .store
        .get_user(id)
        .await
        .map_err(|err| map_store_error(err, "user", "failed to load user"))?;
    Ok(Json(restored))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}/force",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User permanently removed"),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn force_delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_any(&state, &headers, &[rbac::USERS_FORCE_DELETE]).await?;
    state
        .store
        .force_delete_user(id)
        .await
        .map_err(|err| map_store_error(err, "user", "failed to force-delete user"))?;
    Ok(StatusCode::NO_CONTENT)
}

fn sanitize(query: &UserListQuery) -> ListParams {
    ListParams::sanitize(
        &USER_LISTING,
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.sort_dir.as_deref(),
        query.search.as_deref(),
    )
}
