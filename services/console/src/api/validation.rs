//! Field-level validation for form payloads.
//!
//! # Purpose
//! Collects `{field: [messages]}` errors the way the admin forms expect them,
//! then converts into the 422 response shape. Uniqueness is not checked here;
//! duplicate unique fields surface from the store as 409 conflicts.
use crate::api::error::{ApiError, api_validation_error};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("the {field} field is required"));
        }
    }

    /// Empty collection means the payload passed.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(api_validation_error(self.errors))
        }
    }
}

/// Light-weight shape check; the unique constraint is the real gatekeeper.
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !value.contains(char::is_whitespace)
}
