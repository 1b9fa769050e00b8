//! Storage abstraction for the admin console.
//!
//! # Purpose
//! Defines the [`AdminStore`] trait implemented by the in-memory and Postgres
//! backends, the shared error type, and the paginated-listing contract
//! (sanitized sort/search/page parameters and page math) that all three
//! resources use identically.
//!
//! # Listing contract
//! Callers pass raw query parameters; [`ListParams::sanitize`] normalizes them
//! against a per-resource [`ListSpec`]:
//! - `page` is at least 1, `per_page` is clamped to `1..=MAX_PER_PAGE`.
//! - An unrecognized `sort_by` falls back to the resource default; `sort_dir`
//!   falls back to ascending.
//! - `search` is trimmed; when present it must match (case-insensitive
//!   substring) at least one of the resource's searchable columns.
//! Backends must return a total that counts every matching row regardless of
//! the requested window.
use crate::model::{Permission, Role, RoleWithPermissions, User, UserWithRoles};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// A payload referenced a role/permission id that does not exist. Mapped
    /// to a validation failure rather than a 404 at the API layer.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// Per-resource listing allow-lists.
///
/// `sortable` doubles as the set of columns a caller may order by; `searchable`
/// is the fixed set of columns the free-text search is OR'd across. Both are
/// compile-time constants so backends can interpolate column names into SQL
/// without ever touching user input.
#[derive(Debug)]
pub struct ListSpec {
    pub sortable: &'static [&'static str],
    pub searchable: &'static [&'static str],
    pub default_sort: &'static str,
}

pub static USER_LISTING: ListSpec = ListSpec {
    sortable: &["id", "name", "email", "created_at"],
    searchable: &["id", "name", "email", "created_at"],
    default_sort: "name",
};

pub static ROLE_LISTING: ListSpec = ListSpec {
    sortable: &["id", "name", "created_at"],
    searchable: &["name"],
    default_sort: "name",
};

pub static PERMISSION_LISTING: ListSpec = ListSpec {
    sortable: &["id", "name", "created_at"],
    searchable: &["id", "name", "created_at"],
    default_sort: "name",
};

/// Sanitized listing parameters, always derived through [`ListParams::sanitize`].
#[derive(Debug, Clone)]
pub struct ListParams {
    pub spec: &'static ListSpec,
    pub page: u64,
    pub per_page: u64,
    pub sort_by: &'static str,
    pub sort_dir: SortDir,
    pub search: Option<String>,
}

impl ListParams {
    /// Normalize raw query parameters against a resource's allow-lists.
    ///
    /// # What it does
    /// Applies the defaults and fallbacks described in the module docs. The
    /// returned `sort_by` is always a reference into `spec.sortable`, never
    /// caller-provided text.
    pub fn sanitize(
        spec: &'static ListSpec,
        page: Option<u64>,
        per_page: Option<u64>,
        sort_by: Option<&str>,
        sort_dir: Option<&str>,
        search: Option<&str>,
    ) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let sort_by = sort_by
            .and_then(|candidate| {
                spec.sortable
                    .iter()
                    .find(|column| **column == candidate)
                    .copied()
            })
            .unwrap_or(spec.default_sort);
        let sort_dir = match sort_dir.map(str::to_ascii_lowercase).as_deref() {
            Some("desc") => SortDir::Desc,
            _ => SortDir::Asc,
        };
        let search = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);
        Self {
            spec,
            page,
            per_page,
            sort_by,
            sort_dir,
            search,
        }
    }

    /// Zero-based row offset of the requested window.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

/// One page of listing results plus the total match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    /// Last page number; at least 1 even when there are no matches.
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// 1-based ordinal of the first returned item, `None` for an empty page.
    pub fn from(&self) -> Option<u64> {
        if self.items.is_empty() {
            None
        } else {
            Some((self.page - 1) * self.per_page + 1)
        }
    }

    /// 1-based ordinal of the last returned item, `None` for an empty page.
    pub fn to(&self) -> Option<u64> {
        self.from().map(|from| from + self.items.len() as u64 - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Case-insensitive substring test shared by backends that filter in Rust.
pub(crate) fn matches_search(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_ids: Vec<Uuid>,
    pub actor: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    /// `None` keeps the current password.
    pub password_hash: Option<String>,
    pub role_ids: Vec<Uuid>,
    pub actor: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub permission_ids: Vec<Uuid>,
    pub actor: Uuid,
}

#[derive(Debug, Clone)]
pub struct RoleUpdate {
    pub name: String,
    pub permission_ids: Vec<Uuid>,
    pub actor: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub name: String,
    pub actor: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct PermissionUpdate {
    pub name: String,
    pub actor: Uuid,
}

/// Login lookup result: the user record plus its stored Argon2id hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Per-request authorization snapshot for a token subject.
#[derive(Debug, Clone)]
pub struct UserAccess {
    pub user: User,
    pub role_names: Vec<String>,
    /// Union of permission names across all assigned roles.
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardCounts {
    pub users: u64,
    pub trashed_users: u64,
    pub roles: u64,
    pub permissions: u64,
}

/// One-shot seed payload applied by the internal bootstrap endpoint.
#[derive(Debug, Clone)]
pub struct RbacSeed {
    /// Full permission catalog to create.
    pub permissions: Vec<String>,
    pub role_name: String,
    /// Subset of `permissions` granted to the seeded role.
    pub role_permissions: Vec<String>,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password_hash: String,
}

#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub admin_id: Uuid,
    pub role_id: Uuid,
    pub permissions_created: usize,
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    // Users. Listings exclude soft-deleted rows unless `trashed` is set.
    async fn list_users(&self, params: &ListParams, trashed: bool)
    -> StoreResult<Page<UserWithRoles>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<UserWithRoles>;
    async fn create_user(&self, new: NewUser) -> StoreResult<UserWithRoles>;
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<UserWithRoles>;
    async fn soft_delete_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()>;
    async fn restore_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()>;
    async fn force_delete_user(&self, id: Uuid) -> StoreResult<()>;
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>>;
    /// Returns `None` when the subject is missing or soft-deleted; the guard
    /// treats both as an invalidated session.
    async fn user_access(&self, id: Uuid) -> StoreResult<Option<UserAccess>>;

    // Roles.
    async fn list_roles(&self, params: &ListParams) -> StoreResult<Page<Role>>;
    async fn get_role(&self, id: Uuid) -> StoreResult<RoleWithPermissions>;
    async fn create_role(&self, new: NewRole) -> StoreResult<RoleWithPermissions>;
    async fn update_role(&self, id: Uuid, update: RoleUpdate) -> StoreResult<RoleWithPermissions>;
    async fn delete_role(&self, id: Uuid) -> StoreResult<()>;
    /// Unpaginated catalog for assignment forms.
    async fn all_roles(&self) -> StoreResult<Vec<Role>>;

    // Permissions.
    async fn list_permissions(&self, params: &ListParams) -> StoreResult<Page<Permission>>;
    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission>;
    async fn update_permission(
        &self,
        id: Uuid,
        update: PermissionUpdate,
    ) -> StoreResult<Permission>;
    async fn delete_permission(&self, id: Uuid) -> StoreResult<()>;
    async fn all_permissions(&self) -> StoreResult<Vec<Permission>>;

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts>;

    /// True once any user exists; the bootstrap endpoint refuses to run twice.
    async fn is_seeded(&self) -> StoreResult<bool>;
    async fn seed_rbac(&self, seed: RbacSeed) -> StoreResult<SeedOutcome>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_applies_defaults() {
        let params = ListParams::sanitize(&USER_LISTING, None, None, None, None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, DEFAULT_PER_PAGE);
        assert_eq!(params.sort_by, "name");
        assert_eq!(params.sort_dir, SortDir::Asc);
        assert!(params.search.is_none());
    }

    #[test]
    fn sanitize_rejects_unknown_sort_column() {
        let params = ListParams::sanitize(
            &USER_LISTING,
            None,
            None,
            Some("password_hash"),
            Some("desc"),
            None,
        );
        assert_eq!(params.sort_by, "name");
        assert_eq!(params.sort_dir, SortDir::Desc);
    }

    #[test]
    fn sanitize_accepts_allowed_sort_column() {
        let params =
            ListParams::sanitize(&ROLE_LISTING, None, None, Some("created_at"), Some("DESC"), None);
        assert_eq!(params.sort_by, "created_at");
        assert_eq!(params.sort_dir, SortDir::Desc);
    }

    #[test]
    fn sanitize_clamps_paging() {
        let params = ListParams::sanitize(&USER_LISTING, Some(0), Some(10_000), None, None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PER_PAGE);

        let params = ListParams::sanitize(&USER_LISTING, Some(3), Some(0), None, None, None);
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn sanitize_trims_search() {
        let params =
            ListParams::sanitize(&USER_LISTING, None, None, None, None, Some("  alice  "));
        assert_eq!(params.search.as_deref(), Some("alice"));

        let params = ListParams::sanitize(&USER_LISTING, None, None, None, None, Some("   "));
        assert!(params.search.is_none());
    }

    #[test]
    fn page_math_matches_window() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 23,
            page: 2,
            per_page: 10,
        };
        assert_eq!(page.last_page(), 3);
        assert_eq!(page.from(), Some(11));
        assert_eq!(page.to(), Some(13));
    }

    #[test]
    fn page_math_handles_empty_results() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 0,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.last_page(), 1);
        assert_eq!(page.from(), None);
        assert_eq!(page.to(), None);
    }

    #[test]
    fn search_matching_is_case_insensitive() {
        assert!(matches_search("Alice Jones", "jone"));
        assert!(!matches_search("Alice Jones", "bob"));
    }
}
