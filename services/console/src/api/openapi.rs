//! OpenAPI schema aggregation for the console API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for
//! docs and client generation.
use crate::api::bootstrap::{self, BootstrapInitializeRequest, BootstrapInitializeResponse};
use crate::api::types::{
    CreatePermissionRequest, CreateRoleRequest, CreateUserRequest, DashboardSummary,
    DeleteUserResponse, ErrorResponse, FeatureFlags, HealthStatus, ListFilters, MeResponse,
    PageMeta, PermissionListResponse, RoleFormResponse, RoleListResponse, SystemInfo,
    UpdatePermissionRequest, UpdateRoleRequest, UpdateUserRequest, UserFormResponse,
    UserListResponse,
};
use crate::api::{dashboard, permissions, roles, system, users};
use crate::auth::login::{self, LoginRequest, LoginResponse};
use crate::model::{Permission, Role, RoleWithPermissions, User, UserWithRoles};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "warden-console",
        version = "v1",
        description = "Warden admin console HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        login::login,
        login::me,
        dashboard::dashboard,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::restore_user,
        users::force_delete_user,
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::update_role,
        roles::delete_role,
        permissions::list_permissions,
        permissions::create_permission,
        permissions::update_permission,
        permissions::delete_permission,
        bootstrap::initialize
    ),
    components(schemas(
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        PageMeta,
        ListFilters,
        User,
        UserWithRoles,
        UserListResponse,
        UserFormResponse,
        CreateUserRequest,
        UpdateUserRequest,
        DeleteUserResponse,
        Role,
        RoleWithPermissions,
        RoleListResponse,
        RoleFormResponse,
        CreateRoleRequest,
        UpdateRoleRequest,
        Permission,
        PermissionListResponse,
        CreatePermissionRequest,
        UpdatePermissionRequest,
        DashboardSummary,
        MeResponse,
        LoginRequest,
        LoginResponse,
        BootstrapInitializeRequest,
        BootstrapInitializeResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "auth", description = "Login and caller profile"),
        (name = "dashboard", description = "Dashboard summary"),
        (name = "users", description = "User management"),
        (name = "roles", description = "Role management"),
        (name = "permissions", description = "Permission management"),
        (name = "bootstrap", description = "Internal seed endpoint")
    )
)]
pub struct ApiDoc;
