//! Permission catalog and RBAC helpers.
//!
//! # Purpose
//! Names every permission the route table gates on, validates the
//! dot-namespaced grammar for operator-created permissions, and computes the
//! default grant set for the seeded administrator role.
//!
//! Keeping the catalog in one place avoids permission-name drift between the
//! router, the bootstrap seed, and the tests.
pub const USERS_INDEX: &str = "users.index";
pub const USERS_CREATE: &str = "users.create";
pub const USERS_EDIT: &str = "users.edit";
pub const USERS_DELETE: &str = "users.delete";
pub const USERS_RESTORE: &str = "users.restore";
pub const USERS_FORCE_DELETE: &str = "users.force-delete";
pub const ROLES_INDEX: &str = "roles.index";
pub const ROLES_CREATE: &str = "roles.create";
pub const ROLES_EDIT: &str = "roles.edit";
pub const ROLES_DELETE: &str = "roles.delete";
pub const PERMISSIONS_INDEX: &str = "permissions.index";
pub const PERMISSIONS_CREATE: &str = "permissions.create";
pub const PERMISSIONS_EDIT: &str = "permissions.edit";
pub const PERMISSIONS_DELETE: &str = "permissions.delete";

/// Resource-style gate for the roles screens: holding any CRUD permission on
/// roles grants access to the whole resource router, as the original route
/// middleware did.
pub const ROLES_RESOURCE: &[&str] = &[ROLES_INDEX, ROLES_CREATE, ROLES_EDIT, ROLES_DELETE];

/// Every permission the console routes on.
pub fn catalog() -> Vec<&'static str> {
    vec![
        USERS_INDEX,
        USERS_CREATE,
        USERS_EDIT,
        USERS_DELETE,
        USERS_RESTORE,
        USERS_FORCE_DELETE,
        ROLES_INDEX,
        ROLES_CREATE,
        ROLES_EDIT,
        ROLES_DELETE,
        PERMISSIONS_INDEX,
        PERMISSIONS_CREATE,
        PERMISSIONS_EDIT,
        PERMISSIONS_DELETE,
    ]
}

/// Grants for the seeded administrator role: the whole catalog except the
/// `users.*` family, which stays unassigned until an operator delegates it.
pub fn default_admin_grants() -> Vec<&'static str> {
    catalog()
        .into_iter()
        .filter(|name| !name.starts_with("users."))
        .collect()
}

/// Validate the dot-namespaced permission grammar: at least two non-empty
/// segments of lowercase alphanumerics, `-`, or `_`.
pub fn is_valid_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_valid() {
        for name in catalog() {
            assert!(is_valid_name(name), "invalid catalog name: {name}");
        }
    }

    #[test]
    fn admin_grants_exclude_user_management() {
        let grants = default_admin_grants();
        assert!(grants.iter().all(|name| !name.starts_with("users.")));
        assert!(grants.contains(&ROLES_INDEX));
        assert!(grants.contains(&PERMISSIONS_INDEX));
    }

    #[test]
    fn name_grammar_is_enforced() {
        assert!(is_valid_name("users.index"));
        assert!(is_valid_name("reports.export_csv"));
        assert!(is_valid_name("users.force-delete"));
        assert!(!is_valid_name("users"));
        assert!(!is_valid_name("users."));
        assert!(!is_valid_name(".index"));
        assert!(!is_valid_name("Users.Index"));
        assert!(!is_valid_name("users index"));
    }
}
