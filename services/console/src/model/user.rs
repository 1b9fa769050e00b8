//! User model definitions.
//!
//! # Purpose
//! Defines the user record returned by the store and serialized by the HTTP
//! API. The password hash is deliberately not part of this type; credential
//! material only travels through `store::Credentials` during login.
use crate::model::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Set rows are hidden from normal listings and
    /// cannot authenticate until restored.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub deleted_by: Option<Uuid>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// User together with its assigned roles, as listed and edited in the admin UI.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
}
