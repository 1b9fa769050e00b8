//! Postgres-backed implementation of the admin store.
//!
//! # What this module is
//! Implements [`AdminStore`] using Postgres (via `sqlx`) as the durable store
//! for users, roles, permissions, and their association tables.
//!
//! # Key invariants
//! - Every mutating operation that touches an association set (user↔roles,
//!   role↔permissions) runs the record mutation and the sync in a single
//!   transaction, so partial writes never persist.
//! - Association sync is replace-based: delete the old set, insert the new
//!   one. The incoming id list is deduplicated first.
//! - Soft deletes only flip `deleted_at`/`deleted_by`; unique-email
//!   enforcement uses a partial index over live rows, so restores re-check
//!   the constraint and can conflict.
//!
//! # Dynamic SQL
//! `ORDER BY` clauses are assembled with `format!`, which is safe here because
//! the column name always comes from the compile-time [`ListSpec`] allow-list
//! (see [`ListParams::sanitize`]) and the direction is an enum. Search terms
//! are always bound parameters.
//!
//! # Concurrency model
//! The store is shared across async handlers; `sqlx::PgPool` manages
//! connection concurrency. Pool sizing and acquire timeouts are explicit
//! because hanging forever on DB failures is unacceptable for an admin
//! service sitting in front of an operator.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`; failing
//!   migrations fail startup instead of serving a partially working API.
//! - Database URLs may contain credentials; they are never logged.
use super::{
    AdminStore, Credentials, DashboardCounts, ListParams, NewPermission, NewRole, NewUser, Page,
    PermissionUpdate, RbacSeed, RoleUpdate, SeedOutcome, SortDir, StoreError, StoreResult,
    UserAccess, UserUpdate,
};
use crate::config::PostgresConfig;
use crate::model::{Permission, Role, RoleWithPermissions, User, UserWithRoles};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";
const ROLE_COLUMNS: &str = "id, name, created_at, updated_at, created_by, updated_by";
const PERMISSION_COLUMNS: &str = "id, name, created_at, updated_at, created_by, updated_by";

// Search clauses take the raw term as $1; an empty term disables the filter.
// Column sets mirror the per-resource `ListSpec` searchable allow-lists.
const USER_SEARCH: &str = "($1 = '' OR id::text ILIKE '%' || $1 || '%' \
     OR name ILIKE '%' || $1 || '%' \
     OR email ILIKE '%' || $1 || '%' \
     OR created_at::text ILIKE '%' || $1 || '%')";
const ROLE_SEARCH: &str = "($1 = '' OR name ILIKE '%' || $1 || '%')";
const PERMISSION_SEARCH: &str = "($1 = '' OR id::text ILIKE '%' || $1 || '%' \
     OR name ILIKE '%' || $1 || '%' \
     OR created_at::text ILIKE '%' || $1 || '%')";

/// Row shape for the `users` authoritative table.
///
/// DB-facing structs are kept separate from the domain types to isolate
/// schema details from the API model and to make conversion explicit.
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    deleted_by: Option<Uuid>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbCredentials {
    #[sqlx(flatten)]
    user: DbUser,
    password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbRole {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
}

impl From<DbRole> for Role {
    fn from(row: DbRole) -> Self {
        Role {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

/// Role row joined with the owning user id, for batch-loading page roles.
#[derive(Debug, Clone, FromRow)]
struct DbUserRole {
    user_id: Uuid,
    #[sqlx(flatten)]
    role: DbRole,
}

#[derive(Debug, Clone, FromRow)]
struct DbPermission {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
}

impl From<DbPermission> for Permission {
    fn from(row: DbPermission) -> Self {
        Permission {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

/// Durable admin store backed by Postgres.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to Postgres and run migrations.
    ///
    /// # Errors
    /// - Connection, migration, or pool setup failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations. Intended for tests that manage the
    /// schema externally.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    /// Wipe every table. Test-only; lets suites sharing one database start
    /// from a clean slate.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn truncate_all(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE user_roles, role_permissions, users, roles, permissions")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // Pool tuning: cap concurrent DB work and bound waits for a pooled
        // connection so a dead database fails requests fast instead of
        // hanging them. `pg.url` may contain credentials; never log it.
        let connect_options =
            PgConnectOptions::from_str(&pg.url).map_err(|err| StoreError::Unexpected(err.into()))?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;

        if run_migrations {
            // Migrations run before serving requests so handlers can assume
            // the schema exists.
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| StoreError::Unexpected(err.into()))?;
        }

        Ok(Self { pool })
    }

    async fn roles_for_users(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Role>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, DbUserRole>(
            "SELECT ur.user_id, r.id, r.name, r.created_at, r.updated_at, r.created_by, r.updated_by \
             FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = ANY($1) \
             ORDER BY r.name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.role.into());
        }
        Ok(by_user)
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, DbPermission>(
            "SELECT p.id, p.name, p.created_at, p.updated_at, p.created_by, p.updated_by \
             FROM role_permissions rp \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE rp.role_id = $1 \
             ORDER BY p.name",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }
}

fn unexpected(err: sqlx::Error) -> StoreError {
    StoreError::Unexpected(err.into())
}

/// Postgres unique-violation SQLSTATE; mapped to [`StoreError::Conflict`].
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn map_insert_err(err: sqlx::Error, conflict: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(conflict.to_string())
    } else {
        unexpected(err)
    }
}

/// Build the ORDER BY clause from sanitized parameters.
///
/// Safe to interpolate: `sort_by` is a reference into the compile-time
/// allow-list and `sort_dir` is an enum. Name-like columns order
/// case-insensitively to match the in-memory backend.
fn order_clause(params: &ListParams) -> String {
    let dir = match params.sort_dir {
        SortDir::Asc => "ASC",
        SortDir::Desc => "DESC",
    };
    match params.sort_by {
        "name" | "email" => format!("LOWER({}) {dir}", params.sort_by),
        column => format!("{column} {dir}"),
    }
}

fn search_term(params: &ListParams) -> String {
    params.search.clone().unwrap_or_default()
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Verify that every id exists in `table`; errors with [`StoreError::InvalidReference`].
async fn check_references(
    tx: &mut sqlx::PgConnection,
    table: &'static str,
    entity: &'static str,
    ids: &[Uuid],
) -> StoreResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    // `table` is a code-level constant, never user input.
    let query = format!("SELECT COUNT(*) FROM {table} WHERE id = ANY($1)");
    let found: i64 = sqlx::query_scalar(&query)
        .bind(ids)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
    if found as usize != ids.len() {
        return Err(StoreError::InvalidReference(format!("unknown {entity} id")));
    }
    Ok(())
}

#[async_trait]
impl AdminStore for PostgresStore {
    async fn list_users(
        &self,
        params: &ListParams,
        trashed: bool,
    ) -> StoreResult<Page<UserWithRoles>> {
        let deleted_filter = if trashed {
            "deleted_at IS NOT NULL"
        } else {
            "deleted_at IS NULL"
        };
        let term = search_term(params);

        let count_sql = format!("SELECT COUNT(*) FROM users WHERE {deleted_filter} AND {USER_SEARCH}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&term)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let page_sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE {deleted_filter} AND {USER_SEARCH} \
             ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(params)
        );
        let rows = sqlx::query_as::<_, DbUser>(&page_sql)
            .bind(&term)
            .bind(params.per_page as i64)
            .bind(params.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let users: Vec<User> = rows.into_iter().map(User::from).collect();
        let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
        let mut roles = self.roles_for_users(&ids).await?;
        let items = users
            .into_iter()
            .map(|user| UserWithRoles {
                roles: roles.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect();

        Ok(Page {
            items,
            total: total as u64,
            page: params.page,
            per_page: params.per_page,
        })
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<UserWithRoles> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        let mut roles = self.roles_for_users(&[id]).await?;
        Ok(UserWithRoles {
            user: row.into(),
            roles: roles.remove(&id).unwrap_or_default(),
        })
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<UserWithRoles> {
        let role_ids = dedup(&new.role_ids);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        check_references(&mut *tx, "roles", "role", &role_ids).await?;

        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, created_by, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| map_insert_err(err, "email already taken"))?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, role_id FROM unnest($2::uuid[]) AS t(role_id)",
        )
        .bind(row.id)
        .bind(&role_ids)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        let id = row.id;
        let mut roles = self.roles_for_users(&[id]).await?;
        Ok(UserWithRoles {
            user: row.into(),
            roles: roles.remove(&id).unwrap_or_default(),
        })
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<UserWithRoles> {
        let role_ids = dedup(&update.role_ids);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        check_references(&mut *tx, "roles", "role", &role_ids).await?;

        let sql = format!(
            "UPDATE users SET \
                 name = $2, \
                 email = $3, \
                 password_hash = COALESCE($4, password_hash), \
                 updated_at = now(), \
                 updated_by = $5 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.email)
            .bind(update.password_hash.as_deref())
            .bind(update.actor)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|err| map_insert_err(err, "email already taken"))?
            .ok_or_else(|| StoreError::NotFound("user".into()))?;

        // Replace the assignment set in the same transaction as the update.
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, role_id FROM unnest($2::uuid[]) AS t(role_id)",
        )
        .bind(id)
        .bind(&role_ids)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        let mut roles = self.roles_for_users(&[id]).await?;
        Ok(UserWithRoles {
            user: row.into(),
            roles: roles.remove(&id).unwrap_or_default(),
        })
    }

    async fn soft_delete_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), deleted_by = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(actor)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn restore_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()> {
        // Clearing `deleted_at` re-enters the row into the partial unique
        // email index, so a re-taken email surfaces here as a conflict.
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NULL, deleted_by = NULL, \
                 updated_at = now(), updated_by = $2 \
             WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .bind(actor)
        .execute(&self.pool)
        .await
        .map_err(|err| map_insert_err(err, "email already taken"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn force_delete_user(&self, id: Uuid) -> StoreResult<()> {
        // `user_roles` rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users \
             WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, DbCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(row.map(|row| Credentials {
            user: row.user.into(),
            password_hash: row.password_hash,
        }))
    }

    async fn user_access(&self, id: Uuid) -> StoreResult<Option<UserAccess>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        );
        let Some(row) = sqlx::query_as::<_, DbUser>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
        else {
            return Ok(None);
        };

        let role_names: Vec<String> = sqlx::query_scalar(
            "SELECT r.name FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = $1 ORDER BY r.name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        // Effective set: union of permissions across all assigned roles.
        let permissions: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT p.name FROM user_roles ur \
             JOIN role_permissions rp ON rp.role_id = ur.role_id \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE ur.user_id = $1 ORDER BY p.name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(Some(UserAccess {
            user: row.into(),
            role_names,
            permissions,
        }))
    }

    async fn list_roles(&self, params: &ListParams) -> StoreResult<Page<Role>> {
        let term = search_term(params);
        let count_sql = format!("SELECT COUNT(*) FROM roles WHERE {ROLE_SEARCH}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&term)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let page_sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE {ROLE_SEARCH} \
             ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(params)
        );
        let rows = sqlx::query_as::<_, DbRole>(&page_sql)
            .bind(&term)
            .bind(params.per_page as i64)
            .bind(params.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(Page {
            items: rows.into_iter().map(Role::from).collect(),
            total: total as u64,
            page: params.page,
            per_page: params.per_page,
        })
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<RoleWithPermissions> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1");
        let row = sqlx::query_as::<_, DbRole>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound("role".into()))?;
        Ok(RoleWithPermissions {
            role: row.into(),
            permissions: self.permissions_for_role(id).await?,
        })
    }

    async fn create_role(&self, new: NewRole) -> StoreResult<RoleWithPermissions> {
        let permission_ids = dedup(&new.permission_ids);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        check_references(&mut *tx, "permissions", "permission", &permission_ids).await?;

        let sql = format!(
            "INSERT INTO roles (id, name, created_by, updated_by) \
             VALUES ($1, $2, $3, $3) RETURNING {ROLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbRole>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(new.actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| map_insert_err(err, "role name already taken"))?;

        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, permission_id FROM unnest($2::uuid[]) AS t(permission_id)",
        )
        .bind(row.id)
        .bind(&permission_ids)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        let id = row.id;
        Ok(RoleWithPermissions {
            role: row.into(),
            permissions: self.permissions_for_role(id).await?,
        })
    }

    async fn update_role(&self, id: Uuid, update: RoleUpdate) -> StoreResult<RoleWithPermissions> {
        let permission_ids = dedup(&update.permission_ids);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        check_references(&mut *tx, "permissions", "permission", &permission_ids).await?;

        let sql = format!(
            "UPDATE roles SET name = $2, updated_at = now(), updated_by = $3 \
             WHERE id = $1 RETURNING {ROLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbRole>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(update.actor)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|err| map_insert_err(err, "role name already taken"))?
            .ok_or_else(|| StoreError::NotFound("role".into()))?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, permission_id FROM unnest($2::uuid[]) AS t(permission_id)",
        )
        .bind(id)
        .bind(&permission_ids)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        Ok(RoleWithPermissions {
            role: row.into(),
            permissions: self.permissions_for_role(id).await?,
        })
    }

    async fn delete_role(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(())
    }

    async fn all_roles(&self) -> StoreResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name");
        let rows = sqlx::query_as::<_, DbRole>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn list_permissions(&self, params: &ListParams) -> StoreResult<Page<Permission>> {
        let term = search_term(params);
        let count_sql = format!("SELECT COUNT(*) FROM permissions WHERE {PERMISSION_SEARCH}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&term)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let page_sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE {PERMISSION_SEARCH} \
             ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(params)
        );
        let rows = sqlx::query_as::<_, DbPermission>(&page_sql)
            .bind(&term)
            .bind(params.per_page as i64)
            .bind(params.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(Page {
            items: rows.into_iter().map(Permission::from).collect(),
            total: total as u64,
            page: params.page,
            per_page: params.per_page,
        })
    }

    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission> {
        let sql = format!(
            "INSERT INTO permissions (id, name, created_by, updated_by) \
             VALUES ($1, $2, $3, $3) RETURNING {PERMISSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbPermission>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(new.actor)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_insert_err(err, "permission name already taken"))?;
        Ok(row.into())
    }

    async fn update_permission(
        &self,
        id: Uuid,
        update: PermissionUpdate,
    ) -> StoreResult<Permission> {
        let sql = format!(
            "UPDATE permissions SET name = $2, updated_at = now(), updated_by = $3 \
             WHERE id = $1 RETURNING {PERMISSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbPermission>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(update.actor)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_insert_err(err, "permission name already taken"))?
            .ok_or_else(|| StoreError::NotFound("permission".into()))?;
        Ok(row.into())
    }

    async fn delete_permission(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("permission".into()));
        }
        Ok(())
    }

    async fn all_permissions(&self) -> StoreResult<Vec<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY name");
        let rows = sqlx::query_as::<_, DbPermission>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let (users, trashed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE deleted_at IS NULL), \
                    COUNT(*) FILTER (WHERE deleted_at IS NOT NULL) \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        let permissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(DashboardCounts {
            users: users as u64,
            trashed_users: trashed as u64,
            roles: roles as u64,
            permissions: permissions as u64,
        })
    }

    async fn is_seeded(&self) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count > 0)
    }

    async fn seed_rbac(&self, seed: RbacSeed) -> StoreResult<SeedOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
        if users > 0 {
            return Err(StoreError::Conflict("store already seeded".into()));
        }

        let mut permissions_created = 0usize;
        for name in &seed.permissions {
            let result = sqlx::query(
                "INSERT INTO permissions (id, name) VALUES ($1, $2) \
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            permissions_created += result.rows_affected() as usize;
        }

        let role_id = Uuid::new_v4();
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(role_id)
            .bind(&seed.role_name)
            .execute(&mut *tx)
            .await
            .map_err(|err| map_insert_err(err, "role name already taken"))?;
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, p.id FROM permissions p WHERE p.name = ANY($2)",
        )
        .bind(role_id)
        .bind(&seed.role_permissions)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let admin_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4)",
        )
        .bind(admin_id)
        .bind(&seed.admin_name)
        .bind(&seed.admin_email)
        .bind(&seed.admin_password_hash)
        .execute(&mut *tx)
        .await
        .map_err(|err| map_insert_err(err, "email already taken"))?;
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(admin_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        Ok(SeedOutcome {
            admin_id,
            role_id,
            permissions_created,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
