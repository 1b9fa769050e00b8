//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction to keep error shapes uniform
//! across console endpoints.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Validation failures additionally carry a `{field: [messages]}` map so
//!   forms can attach errors to inputs.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::collections::BTreeMap;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn simple(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            errors: None,
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    simple(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 404 error for disabled features.
///
/// Uses NOT_FOUND to avoid revealing that the endpoint exists but is off.
pub fn api_not_enabled(message: &str) -> ApiError {
    simple(StatusCode::NOT_FOUND, "not_enabled", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    simple(StatusCode::CONFLICT, code, message)
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(message: &str) -> ApiError {
    simple(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(message: &str) -> ApiError {
    simple(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 422 validation error carrying field-level messages.
pub fn api_validation_error(errors: BTreeMap<String, Vec<String>>) -> ApiError {
    ApiError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        body: ErrorResponse {
            code: "validation_error".to_string(),
            message: "the given data was invalid".to_string(),
            errors: Some(errors),
        },
    }
}

/// Build a 500 Internal Server Error from a store error.
///
/// Logs the store error server-side and returns a generic message.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "console storage error");
    simple(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 Internal Server Error without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    simple(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Map a store failure from a CRUD handler onto the HTTP contract.
///
/// `entity` names the record for 404/409 messages; association references that
/// point nowhere come back as a field-level validation failure per the form
/// contract.
pub fn map_store_error(err: StoreError, entity: &str, context: &str) -> ApiError {
    match err {
        StoreError::NotFound(_) => api_not_found(&format!("{entity} not found")),
        StoreError::Conflict(message) => api_conflict("already_exists", &message),
        StoreError::InvalidReference(message) => {
            let mut errors = BTreeMap::new();
            errors.insert("associations".to_string(), vec![message]);
            api_validation_error(errors)
        }
        err => api_internal(context, &err),
    }
}
