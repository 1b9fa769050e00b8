//! Bootstrap API handlers.
//!
//! # Purpose
//! Implements the initial seed flow on the internal router: creates the
//! permission catalog, the administrator role, and the first administrator
//! account. Guarded by a shared token and refused once any user exists.
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_internal_message, api_not_enabled, api_unauthorized,
};
use crate::api::validation::{FieldErrors, looks_like_email};
use crate::app::AppState;
use crate::auth::password::hash_password;
use crate::auth::rbac;
use crate::store::{RbacSeed, StoreError};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

const BOOTSTRAP_TOKEN_HEADER: &str = "X-Warden-Bootstrap-Token";

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct BootstrapInitializeRequest {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Extra dot-namespaced permissions to create alongside the catalog.
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BootstrapInitializeResponse {
    pub admin_id: Uuid,
    pub role: String,
    pub permissions_created: usize,
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/internal/bootstrap/initialize",
    tag = "bootstrap",
    request_body = BootstrapInitializeRequest,
    responses(
        (status = 200, description = "Seed applied", body = BootstrapInitializeResponse),
        (status = 401, description = "Bad bootstrap token"),
        (status = 404, description = "Bootstrap not enabled"),
        (status = 409, description = "Already seeded"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn initialize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BootstrapInitializeRequest>,
) -> Result<Json<BootstrapInitializeResponse>, ApiError> {
    if !state.bootstrap_enabled {
        return Err(api_not_enabled("bootstrap not enabled"));
    }
    ensure_bootstrap_authorized(&state, &headers)?;

    let mut errors = FieldErrors::new();
    errors.require("admin_name", &body.admin_name);
    errors.require("admin_email", &body.admin_email);
    if !body.admin_email.trim().is_empty() && !looks_like_email(body.admin_email.trim()) {
        errors.push("admin_email", "the email must be a valid email address");
    }
    errors.require("admin_password", &body.admin_password);
    for name in &body.extra_permissions {
        if !rbac::is_valid_name(name) {
            errors.push("extra_permissions", format!("invalid permission name: {name}"));
        }
    }
    errors.into_result()?;

    let seeded = state
        .store
        .is_seeded()
        .await
        .map_err(|err| api_internal("failed to check seed state", &err))?;
    if seeded {
        return Err(api_conflict("already_seeded", "store already seeded"));
    }

    let mut permissions: Vec<String> =
        rbac::catalog().into_iter().map(str::to_string).collect();
    for extra in &body.extra_permissions {
        if !permissions.iter().any(|name| name == extra) {
            permissions.push(extra.clone());
        }
    }

    let password_hash = hash_password(&body.admin_password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        api_internal_message("failed to hash admin password")
    })?;

    let outcome = state
        .store
        .seed_rbac(RbacSeed {
            permissions,
            role_name: "admin".to_string(),
            // The admin role gets the whole catalog except user management,
            // which stays unassigned until explicitly delegated.
            role_permissions: rbac::default_admin_grants()
                .into_iter()
                .map(str::to_string)
                .collect(),
            admin_name: body.admin_name.trim().to_string(),
            admin_email: body.admin_email.trim().to_string(),
            admin_password_hash: password_hash,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(message) => api_conflict("already_seeded", &message),
            err => api_internal("failed to seed store", &err),
        })?;

    tracing::info!(admin_id = %outcome.admin_id, "bootstrap seed applied");
    Ok(Json(BootstrapInitializeResponse {
        admin_id: outcome.admin_id,
        role: "admin".to_string(),
        permissions_created: outcome.permissions_created,
        status: "initialized".to_string(),
    }))
}

fn ensure_bootstrap_authorized(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = match headers.get(BOOTSTRAP_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| api_unauthorized("invalid bootstrap token"))?,
        None => return Err(api_unauthorized("missing bootstrap token")),
    };

    let expected = state
        .bootstrap_token
        .as_ref()
        .ok_or_else(|| api_internal_message("bootstrap token missing"))?;

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(api_unauthorized("invalid bootstrap token"));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_compares_content() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"other"));
        assert!(!constant_time_eq(b"token", b"tokens"));
    }
}
