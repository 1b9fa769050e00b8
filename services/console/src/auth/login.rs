//! Login and profile endpoints.
//!
//! # Purpose
//! Exchanges email + password for a session JWT and exposes the caller's
//! profile with its effective permission set for the dashboard shell.
use crate::api::error::{ApiError, api_internal, api_internal_message, api_unauthorized};
use crate::api::types::MeResponse;
use crate::app::AppState;
use crate::auth::guard::authenticate;
use crate::auth::password::verify_password;
use crate::auth::token::mint_token;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = state
        .store
        .find_credentials(body.email.trim())
        .await
        .map_err(|err| api_internal("failed to look up credentials", &err))?
        // Unknown email and wrong password answer identically.
        .ok_or_else(|| api_unauthorized("invalid credentials"))?;

    let matches = verify_password(&body.password, &credentials.password_hash).map_err(|err| {
        tracing::error!(error = %err, "stored password hash is unreadable");
        api_internal_message("failed to verify credentials")
    })?;
    if !matches {
        return Err(api_unauthorized("invalid credentials"));
    }

    let token = mint_token(&state.signing_keys, credentials.user.id, state.token_ttl)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to mint session token");
            api_internal_message("failed to issue session token")
        })?;

    metrics::counter!("console_logins_total").increment(1);
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.token_ttl.as_secs(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated caller profile", body = MeResponse),
        (status = 401, description = "Unauthenticated", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let current = authenticate(&state, &headers).await?;
    let mut permissions: Vec<String> = current.permissions.into_iter().collect();
    permissions.sort();
    Ok(Json(MeResponse {
        user: current.user,
        roles: current.role_names,
        permissions,
    }))
}
