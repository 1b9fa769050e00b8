//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the console REST API and OpenAPI schema
//! generation. Listing responses deliberately repeat the same
//! `{items, meta, filters}` shape per resource so each keeps its own schema.
use crate::model::{Permission, Role, RoleWithPermissions, User, UserWithRoles};
use crate::store::{ListParams, Page};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeatureFlags {
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub api_version: String,
    pub storage_backend: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Field-level validation messages, present only for `validation_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Raw listing query parameters; sanitized via `ListParams::sanitize` before
/// they reach a store.
#[derive(Debug, Deserialize, IntoParams, Default, Clone)]
pub struct ListQueryParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub search: Option<String>,
}

/// Pagination metadata mirrored from the sanitized window.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PageMeta {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    /// 1-based ordinal of the first item on this page, null when empty.
    pub from: Option<u64>,
    /// 1-based ordinal of the last item on this page, null when empty.
    pub to: Option<u64>,
}

impl PageMeta {
    pub fn of<T>(page: &Page<T>) -> Self {
        Self {
            current_page: page.page,
            last_page: page.last_page(),
            per_page: page.per_page,
            total: page.total,
            from: page.from(),
            to: page.to(),
        }
    }
}

/// The sanitized filters echoed back so the client can render its controls.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ListFilters {
    pub search: Option<String>,
    pub sort_by: String,
    pub sort_dir: String,
}

impl ListFilters {
    pub fn of(params: &ListParams) -> Self {
        Self {
            search: params.search.clone(),
            sort_by: params.sort_by.to_string(),
            sort_dir: params.sort_dir.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserWithRoles>,
    pub meta: PageMeta,
    pub filters: ListFilters,
}

impl UserListResponse {
    pub fn new(page: Page<UserWithRoles>, params: &ListParams) -> Self {
        Self {
            meta: PageMeta::of(&page),
            filters: ListFilters::of(params),
            items: page.items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleListResponse {
    pub items: Vec<Role>,
    pub meta: PageMeta,
    pub filters: ListFilters,
}

impl RoleListResponse {
    pub fn new(page: Page<Role>, params: &ListParams) -> Self {
        Self {
            meta: PageMeta::of(&page),
            filters: ListFilters::of(params),
            items: page.items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionListResponse {
    pub items: Vec<Permission>,
    pub meta: PageMeta,
    pub filters: ListFilters,
}

impl PermissionListResponse {
    pub fn new(page: Page<Permission>, params: &ListParams) -> Self {
        Self {
            meta: PageMeta::of(&page),
            filters: ListFilters::of(params),
            items: page.items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(default)]
    pub roles: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    /// Omit (or null) to keep the current password.
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    #[serde(default)]
    pub roles: Vec<Uuid>,
}

/// Edit-form payload: the user plus the full role catalog for the picker.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserFormResponse {
    pub user: UserWithRoles,
    pub roles: Vec<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteUserResponse {
    pub status: String,
    /// Set to `login` when the caller deleted their own account and must
    /// re-authenticate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpdateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

/// Edit-form payload: the role plus the full permission catalog.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleFormResponse {
    pub role: RoleWithPermissions,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreatePermissionRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpdatePermissionRequest {
    pub name: String,
}

/// Entity counts rendered by the dashboard shell.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DashboardSummary {
    pub users: u64,
    pub trashed_users: u64,
    pub roles: u64,
    pub permissions: u64,
}

/// Authenticated caller profile for `/v1/auth/me`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
