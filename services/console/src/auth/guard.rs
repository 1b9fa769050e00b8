//! Per-request authentication and permission enforcement.
//!
//! # Purpose
//! Resolves the bearer token into a [`CurrentUser`] and rejects requests
//! before any handler service logic runs: missing/invalid tokens are 401,
//! vanished or soft-deleted subjects are 401 (this is what ends sessions
//! after a self-delete), and callers holding none of a route's declared
//! permissions are 403.
//!
//! The subject's roles and effective permissions are loaded from the store on
//! every request, so assignment changes apply immediately without a token
//! reissue.
use crate::api::error::{ApiError, api_forbidden, api_internal, api_unauthorized};
use crate::app::AppState;
use crate::auth::token::verify_token;
use crate::model::User;
use axum::http::HeaderMap;
use std::collections::HashSet;

/// Allowed clock skew when validating token timestamps.
const TOKEN_LEEWAY_SECS: u64 = 5;

/// The authenticated caller with its effective permission set.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub role_names: Vec<String>,
    pub permissions: HashSet<String>,
}

impl CurrentUser {
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn can_any(&self, required: &[&str]) -> bool {
        required.iter().any(|permission| self.can(permission))
    }
}

/// Resolve the bearer token into a [`CurrentUser`].
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let bearer = extract_bearer(headers).ok_or_else(|| deny("missing_token"))?;
    let claims = verify_token(&state.signing_keys, bearer, TOKEN_LEEWAY_SECS)
        .map_err(|_| deny("invalid_token"))?;
    let subject = claims.subject().map_err(|_| deny("invalid_token"))?;

    let access = state
        .store
        .user_access(subject)
        .await
        .map_err(|err| api_internal("failed to load caller", &err))?
        // Missing or soft-deleted subject: the session is no longer valid.
        .ok_or_else(|| {
            metrics::counter!("console_auth_denied_total", "reason" => "stale_session")
                .increment(1);
            api_unauthorized("session is no longer valid")
        })?;

    Ok(CurrentUser {
        user: access.user,
        role_names: access.role_names,
        permissions: access.permissions.into_iter().collect(),
    })
}

/// Authenticate and require at least one of the declared permissions.
pub async fn require_any(
    state: &AppState,
    headers: &HeaderMap,
    required: &[&str],
) -> Result<CurrentUser, ApiError> {
    let current = authenticate(state, headers).await?;
    if !current.can_any(required) {
        metrics::counter!("console_auth_denied_total", "reason" => "forbidden").increment(1);
        return Err(api_forbidden(&format!(
            "missing permission: {}",
            required.join("|")
        )));
    }
    Ok(current)
}

fn deny(reason: &'static str) -> ApiError {
    metrics::counter!("console_auth_denied_total", "reason" => reason).increment(1);
    let message = match reason {
        "missing_token" => "missing bearer token",
        _ => "invalid token",
    };
    api_unauthorized(message)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}
