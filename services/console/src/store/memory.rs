//! In-memory implementation of the admin store.
//!
//! # Purpose
//! Implements [`AdminStore`] entirely in memory. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: all tables live behind one
//!   `tokio::sync::RwLock`, so a mutation and its association sync commit
//!   together or not at all, matching the atomicity the Postgres backend gets
//!   from transactions.
//!
//! # Performance characteristics
//! Listings filter and sort the full table in Rust. That is fine for the
//! dataset sizes an admin panel handles; the Postgres backend pushes the same
//! contract down into SQL.
use super::{
    AdminStore, Credentials, DashboardCounts, ListParams, NewPermission, NewRole, NewUser, Page,
    PermissionUpdate, RbacSeed, RoleUpdate, SeedOutcome, SortDir, StoreError, StoreResult,
    UserAccess, UserUpdate, matches_search,
};
use crate::model::{Permission, Role, RoleWithPermissions, User, UserWithRoles};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, StoredUser>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    /// user id -> assigned role ids
    user_roles: HashMap<Uuid, HashSet<Uuid>>,
    /// role id -> granted permission ids
    role_permissions: HashMap<Uuid, HashSet<Uuid>>,
}

impl State {
    fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> bool {
        let needle = email.to_lowercase();
        self.users.values().any(|stored| {
            stored.user.deleted_at.is_none()
                && Some(stored.user.id) != exclude
                && stored.user.email.to_lowercase() == needle
        })
    }

    fn role_name_taken(&self, name: &str, exclude: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|role| Some(role.id) != exclude && role.name == name)
    }

    fn permission_name_taken(&self, name: &str, exclude: Option<Uuid>) -> bool {
        self.permissions
            .values()
            .any(|permission| Some(permission.id) != exclude && permission.name == name)
    }

    fn check_role_ids(&self, ids: &[Uuid]) -> StoreResult<()> {
        for id in ids {
            if !self.roles.contains_key(id) {
                return Err(StoreError::InvalidReference(format!("role {id}")));
            }
        }
        Ok(())
    }

    fn check_permission_ids(&self, ids: &[Uuid]) -> StoreResult<()> {
        for id in ids {
            if !self.permissions.contains_key(id) {
                return Err(StoreError::InvalidReference(format!("permission {id}")));
            }
        }
        Ok(())
    }

    fn roles_of(&self, user_id: Uuid) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .user_roles
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|role_id| self.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    fn permissions_of(&self, role_id: Uuid) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter_map(|permission_id| self.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions
    }

    fn with_roles(&self, stored: &StoredUser) -> UserWithRoles {
        UserWithRoles {
            user: stored.user.clone(),
            roles: self.roles_of(stored.user.id),
        }
    }
}

/// In-memory admin store.
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }
}

/// Render the value of a listing column for search matching. Columns outside
/// the allow-lists are unreachable because `ListParams` is always sanitized.
fn user_column(user: &User, column: &str) -> String {
    match column {
        "id" => user.id.to_string(),
        "name" => user.name.clone(),
        "email" => user.email.clone(),
        "created_at" => user.created_at.to_rfc3339(),
        other => unreachable!("column {other} not in allow-list"),
    }
}

fn permission_column(permission: &Permission, column: &str) -> String {
    match column {
        "id" => permission.id.to_string(),
        "name" => permission.name.clone(),
        "created_at" => permission.created_at.to_rfc3339(),
        other => unreachable!("column {other} not in allow-list"),
    }
}

fn sort_users(items: &mut [User], params: &ListParams) {
    items.sort_by(|a, b| {
        let ordering = match params.sort_by {
            "id" => a.id.cmp(&b.id),
            "email" => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match params.sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn sort_roles(items: &mut [Role], params: &ListParams) {
    items.sort_by(|a, b| {
        let ordering = match params.sort_by {
            "id" => a.id.cmp(&b.id),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match params.sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn sort_permissions(items: &mut [Permission], params: &ListParams) {
    items.sort_by(|a, b| {
        let ordering = match params.sort_by {
            "id" => a.id.cmp(&b.id),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match params.sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn paginate<T>(items: Vec<T>, params: &ListParams) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.per_page as usize)
        .collect();
    Page {
        items,
        total,
        page: params.page,
        per_page: params.per_page,
    }
}

#[async_trait]
impl AdminStore for InMemoryStore {
    async fn list_users(
        &self,
        params: &ListParams,
        trashed: bool,
    ) -> StoreResult<Page<UserWithRoles>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|stored| stored.user.clone())
            .filter(|user| user.is_deleted() == trashed)
            .filter(|user| match &params.search {
                Some(term) => params
                    .spec
                    .searchable
                    .iter()
                    .any(|column| matches_search(&user_column(user, column), term)),
                None => true,
            })
            .collect();
        sort_users(&mut users, params);
        let page = paginate(users, params);
        Ok(page.map(|user| UserWithRoles {
            roles: state.roles_of(user.id),
            user,
        }))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<UserWithRoles> {
        let state = self.state.read().await;
        let stored = state
            .users
            .get(&id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        Ok(state.with_roles(stored))
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<UserWithRoles> {
        let mut state = self.state.write().await;
        if state.email_taken(&new.email, None) {
            return Err(StoreError::Conflict("email already taken".into()));
        }
        state.check_role_ids(&new.role_ids)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: new.actor,
            updated_by: new.actor,
            deleted_by: None,
        };
        let id = user.id;
        state.users.insert(
            id,
            StoredUser {
                user,
                password_hash: new.password_hash,
            },
        );
        state
            .user_roles
            .insert(id, new.role_ids.into_iter().collect());
        let stored = state.users.get(&id).expect("just inserted");
        Ok(state.with_roles(stored))
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<UserWithRoles> {
        let mut state = self.state.write().await;
        if state.email_taken(&update.email, Some(id)) {
            return Err(StoreError::Conflict("email already taken".into()));
        }
        state.check_role_ids(&update.role_ids)?;

        let stored = state
            .users
            .get_mut(&id)
            .filter(|stored| stored.user.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        stored.user.name = update.name;
        stored.user.email = update.email;
        if let Some(hash) = update.password_hash {
            stored.password_hash = hash;
        }
        stored.user.updated_at = Utc::now();
        stored.user.updated_by = Some(update.actor);
        // Replace, not merge: the incoming set is the whole assignment.
        state
            .user_roles
            .insert(id, update.role_ids.into_iter().collect());
        let stored = state.users.get(&id).expect("present");
        Ok(state.with_roles(stored))
    }

    async fn soft_delete_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .users
            .get_mut(&id)
            .filter(|stored| stored.user.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        stored.user.deleted_at = Some(Utc::now());
        stored.user.deleted_by = Some(actor);
        Ok(())
    }

    async fn restore_user(&self, id: Uuid, actor: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let email = state
            .users
            .get(&id)
            .filter(|stored| stored.user.deleted_at.is_some())
            .map(|stored| stored.user.email.clone())
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        // The email may have been re-taken while this row was trashed.
        if state.email_taken(&email, Some(id)) {
            return Err(StoreError::Conflict("email already taken".into()));
        }
        let stored = state.users.get_mut(&id).expect("present");
        stored.user.deleted_at = None;
        stored.user.deleted_by = None;
        stored.user.updated_at = Utc::now();
        stored.user.updated_by = Some(actor);
        Ok(())
    }

    async fn force_delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("user".into()));
        }
        state.user_roles.remove(&id);
        Ok(())
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let state = self.state.read().await;
        let needle = email.to_lowercase();
        Ok(state
            .users
            .values()
            .find(|stored| {
                stored.user.deleted_at.is_none() && stored.user.email.to_lowercase() == needle
            })
            .map(|stored| Credentials {
                user: stored.user.clone(),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn user_access(&self, id: Uuid) -> StoreResult<Option<UserAccess>> {
        let state = self.state.read().await;
        let Some(stored) = state
            .users
            .get(&id)
            .filter(|stored| stored.user.deleted_at.is_none())
        else {
            return Ok(None);
        };
        let roles = state.roles_of(id);
        // Union across roles; BTreeSet gives a stable order for responses.
        let permissions: BTreeSet<String> = roles
            .iter()
            .flat_map(|role| state.permissions_of(role.id))
            .map(|permission| permission.name)
            .collect();
        Ok(Some(UserAccess {
            user: stored.user.clone(),
            role_names: roles.into_iter().map(|role| role.name).collect(),
            permissions: permissions.into_iter().collect(),
        }))
    }

    async fn list_roles(&self, params: &ListParams) -> StoreResult<Page<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| match &params.search {
                Some(term) => matches_search(&role.name, term),
                None => true,
            })
            .cloned()
            .collect();
        sort_roles(&mut roles, params);
        Ok(paginate(roles, params))
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<RoleWithPermissions> {
        let state = self.state.read().await;
        let role = state
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("role".into()))?;
        Ok(RoleWithPermissions {
            permissions: state.permissions_of(id),
            role,
        })
    }

    async fn create_role(&self, new: NewRole) -> StoreResult<RoleWithPermissions> {
        let mut state = self.state.write().await;
        if state.role_name_taken(&new.name, None) {
            return Err(StoreError::Conflict("role name already taken".into()));
        }
        state.check_permission_ids(&new.permission_ids)?;

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name: new.name,
            created_at: now,
            updated_at: now,
            created_by: Some(new.actor),
            updated_by: Some(new.actor),
        };
        let id = role.id;
        state.roles.insert(id, role.clone());
        state
            .role_permissions
            .insert(id, new.permission_ids.into_iter().collect());
        Ok(RoleWithPermissions {
            permissions: state.permissions_of(id),
            role,
        })
    }

    async fn update_role(&self, id: Uuid, update: RoleUpdate) -> StoreResult<RoleWithPermissions> {
        let mut state = self.state.write().await;
        if state.role_name_taken(&update.name, Some(id)) {
            return Err(StoreError::Conflict("role name already taken".into()));
        }
        state.check_permission_ids(&update.permission_ids)?;

        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("role".into()))?;
        role.name = update.name;
        role.updated_at = Utc::now();
        role.updated_by = Some(update.actor);
        let role = role.clone();
        state
            .role_permissions
            .insert(id, update.permission_ids.into_iter().collect());
        Ok(RoleWithPermissions {
            permissions: state.permissions_of(id),
            role,
        })
    }

    async fn delete_role(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Err(StoreError::NotFound("role".into()));
        }
        state.role_permissions.remove(&id);
        for assigned in state.user_roles.values_mut() {
            assigned.remove(&id);
        }
        Ok(())
    }

    async fn all_roles(&self) -> StoreResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list_permissions(&self, params: &ListParams) -> StoreResult<Page<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|permission| match &params.search {
                Some(term) => params
                    .spec
                    .searchable
                    .iter()
                    .any(|column| matches_search(&permission_column(permission, column), term)),
                None => true,
            })
            .cloned()
            .collect();
        sort_permissions(&mut permissions, params);
        Ok(paginate(permissions, params))
    }

    async fn create_permission(&self, new: NewPermission) -> StoreResult<Permission> {
        let mut state = self.state.write().await;
        if state.permission_name_taken(&new.name, None) {
            return Err(StoreError::Conflict("permission name already taken".into()));
        }
        let now = Utc::now();
        let permission = Permission {
            id: Uuid::new_v4(),
            name: new.name,
            created_at: now,
            updated_at: now,
            created_by: new.actor,
            updated_by: new.actor,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: Uuid,
        update: PermissionUpdate,
    ) -> StoreResult<Permission> {
        let mut state = self.state.write().await;
        if state.permission_name_taken(&update.name, Some(id)) {
            return Err(StoreError::Conflict("permission name already taken".into()));
        }
        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("permission".into()))?;
        permission.name = update.name;
        permission.updated_at = Utc::now();
        permission.updated_by = Some(update.actor);
        Ok(permission.clone())
    }

    async fn delete_permission(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.permissions.remove(&id).is_none() {
            return Err(StoreError::NotFound("permission".into()));
        }
        for granted in state.role_permissions.values_mut() {
            granted.remove(&id);
        }
        Ok(())
    }

    async fn all_permissions(&self) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let state = self.state.read().await;
        let trashed = state
            .users
            .values()
            .filter(|stored| stored.user.deleted_at.is_some())
            .count() as u64;
        Ok(DashboardCounts {
            users: state.users.len() as u64 - trashed,
            trashed_users: trashed,
            roles: state.roles.len() as u64,
            permissions: state.permissions.len() as u64,
        })
    }

    async fn is_seeded(&self) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(!state.users.is_empty())
    }

    async fn seed_rbac(&self, seed: RbacSeed) -> StoreResult<SeedOutcome> {
        let mut state = self.state.write().await;
        if !state.users.is_empty() {
            return Err(StoreError::Conflict("store already seeded".into()));
        }

        let now = Utc::now();
        let mut by_name = HashMap::new();
        for name in &seed.permissions {
            if state.permission_name_taken(name, None) {
                continue;
            }
            let permission = Permission {
                id: Uuid::new_v4(),
                name: name.clone(),
                created_at: now,
                updated_at: now,
                created_by: None,
                updated_by: None,
            };
            by_name.insert(name.clone(), permission.id);
            state.permissions.insert(permission.id, permission);
        }

        let role = Role {
            id: Uuid::new_v4(),
            name: seed.role_name.clone(),
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        };
        let role_id = role.id;
        state.roles.insert(role_id, role);
        let granted: HashSet<Uuid> = seed
            .role_permissions
            .iter()
            .filter_map(|name| by_name.get(name).copied())
            .collect();
        state.role_permissions.insert(role_id, granted);

        let admin = User {
            id: Uuid::new_v4(),
            name: seed.admin_name,
            email: seed.admin_email,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: None,
            updated_by: None,
            deleted_by: None,
        };
        let admin_id = admin.id;
        state.users.insert(
            admin_id,
            StoredUser {
                user: admin,
                password_hash: seed.admin_password_hash,
            },
        );
        state
            .user_roles
            .insert(admin_id, HashSet::from([role_id]));

        Ok(SeedOutcome {
            admin_id,
            role_id,
            permissions_created: by_name.len(),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PERMISSION_LISTING, ROLE_LISTING, USER_LISTING};

    fn params(spec: &'static crate::store::ListSpec) -> ListParams {
        ListParams::sanitize(spec, None, None, None, None, None)
    }

    async fn store_with_admin() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let outcome = store
            .seed_rbac(RbacSeed {
                permissions: vec!["users.index".into(), "roles.index".into()],
                role_name: "admin".into(),
                role_permissions: vec!["roles.index".into()],
                admin_name: "Administrator".into(),
                admin_email: "admin@example.com".into(),
                admin_password_hash: "hash".into(),
            })
            .await
            .expect("seed");
        (store, outcome.admin_id)
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let (store, admin) = store_with_admin().await;
        let new = NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            role_ids: vec![],
            actor: Some(admin),
        };
        store.create_user(new.clone()).await.expect("first create");
        let duplicate = NewUser {
            email: "ALICE@example.com".into(),
            ..new
        };
        let err = store.create_user(duplicate).await.expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_delete_then_restore_round_trips() {
        let (store, admin) = store_with_admin().await;
        let created = store
            .create_user(NewUser {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role_ids: vec![],
                actor: Some(admin),
            })
            .await
            .expect("create");
        let id = created.user.id;

        store.soft_delete_user(id, admin).await.expect("delete");
        let trashed = store.get_user(id).await.expect("still readable");
        assert!(trashed.user.is_deleted());
        assert_eq!(trashed.user.deleted_by, Some(admin));

        // Hidden from the live listing, visible in the trashed one.
        let live = store
            .list_users(&params(&USER_LISTING), false)
            .await
            .expect("list");
        assert!(live.items.iter().all(|item| item.user.id != id));
        let bin = store
            .list_users(&params(&USER_LISTING), true)
            .await
            .expect("list trashed");
        assert!(bin.items.iter().any(|item| item.user.id == id));

        store.restore_user(id, admin).await.expect("restore");
        let restored = store.get_user(id).await.expect("read");
        assert!(!restored.user.is_deleted());
        assert!(restored.user.deleted_by.is_none());
    }

    #[tokio::test]
    async fn soft_deleted_user_cannot_authenticate() {
        let (store, admin) = store_with_admin().await;
        store.soft_delete_user(admin, admin).await.expect("delete");
        assert!(store.user_access(admin).await.expect("access").is_none());
        assert!(
            store
                .find_credentials("admin@example.com")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn role_sync_replaces_previous_set() {
        let (store, admin) = store_with_admin().await;
        let perms = store.all_permissions().await.expect("perms");
        let users_index = perms.iter().find(|p| p.name == "users.index").unwrap().id;
        let roles_index = perms.iter().find(|p| p.name == "roles.index").unwrap().id;

        let role = store
            .create_role(NewRole {
                name: "auditor".into(),
                permission_ids: vec![users_index],
                actor: admin,
            })
            .await
            .expect("create role");
        assert_eq!(role.permissions.len(), 1);

        let updated = store
            .update_role(
                role.role.id,
                RoleUpdate {
                    name: "auditor".into(),
                    permission_ids: vec![roles_index, roles_index],
                    actor: admin,
                },
            )
            .await
            .expect("update role");
        // Old grant gone, duplicate collapsed.
        assert_eq!(updated.permissions.len(), 1);
        assert_eq!(updated.permissions[0].name, "roles.index");
    }

    #[tokio::test]
    async fn unknown_association_ids_are_invalid_references() {
        let (store, admin) = store_with_admin().await;
        let err = store
            .create_user(NewUser {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role_ids: vec![Uuid::new_v4()],
                actor: Some(admin),
            })
            .await
            .expect_err("unknown role");
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn effective_permissions_union_across_roles() {
        let (store, admin) = store_with_admin().await;
        let perms = store.all_permissions().await.expect("perms");
        let users_index = perms.iter().find(|p| p.name == "users.index").unwrap().id;
        let second = store
            .create_role(NewRole {
                name: "viewer".into(),
                permission_ids: vec![users_index],
                actor: admin,
            })
            .await
            .expect("role");

        let roles = store.all_roles().await.expect("roles");
        let admin_role = roles.iter().find(|r| r.name == "admin").unwrap().id;
        let admin_user = store.get_user(admin).await.expect("admin");
        store
            .update_user(
                admin,
                UserUpdate {
                    name: admin_user.user.name.clone(),
                    email: admin_user.user.email.clone(),
                    password_hash: None,
                    role_ids: vec![admin_role, second.role.id],
                    actor: admin,
                },
            )
            .await
            .expect("assign");

        let access = store
            .user_access(admin)
            .await
            .expect("access")
            .expect("live");
        assert_eq!(
            access.permissions,
            vec!["roles.index".to_string(), "users.index".to_string()]
        );
    }

    #[tokio::test]
    async fn listing_search_is_case_insensitive_or_across_columns() {
        let (store, admin) = store_with_admin().await;
        for (name, email) in [("Alice", "alice@corp.test"), ("Bob", "bob@corp.test")] {
            store
                .create_user(NewUser {
                    name: name.into(),
                    email: email.into(),
                    password_hash: "hash".into(),
                    role_ids: vec![],
                    actor: Some(admin),
                })
                .await
                .expect("create");
        }
        let params = ListParams::sanitize(&USER_LISTING, None, None, None, None, Some("ALICE"));
        let page = store.list_users(&params, false).await.expect("list");
        // Matches the name column and the email column of the same row.
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user.name, "Alice");
    }

    #[tokio::test]
    async fn role_listing_searches_name_only() {
        let (store, admin) = store_with_admin().await;
        store
            .create_role(NewRole {
                name: "auditor".into(),
                permission_ids: vec![],
                actor: admin,
            })
            .await
            .expect("role");
        let params = ListParams::sanitize(&ROLE_LISTING, None, None, None, None, Some("audit"));
        let page = store.list_roles(&params).await.expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "auditor");
    }

    #[tokio::test]
    async fn totals_are_window_independent() {
        let (store, admin) = store_with_admin().await;
        for i in 0..25 {
            store
                .create_permission(NewPermission {
                    name: format!("reports.view{i}"),
                    actor: Some(admin),
                })
                .await
                .expect("create");
        }
        let params =
            ListParams::sanitize(&PERMISSION_LISTING, Some(3), Some(10), None, None, None);
        let page = store.list_permissions(&params).await.expect("list");
        assert_eq!(page.total, 27); // 25 created + 2 seeded
        assert_eq!(page.items.len(), 7);
        assert_eq!(page.last_page(), 3);
    }

    #[tokio::test]
    async fn seed_is_single_shot() {
        let (store, _) = store_with_admin().await;
        let err = store
            .seed_rbac(RbacSeed {
                permissions: vec![],
                role_name: "admin".into(),
                role_permissions: vec![],
                admin_name: "Second".into(),
                admin_email: "second@example.com".into(),
                admin_password_hash: "hash".into(),
            })
            .await
            .expect_err("second seed");
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
