//! Admin console data model module.
//!
//! # Purpose
//! Re-exports the user/role/permission records and the composed shapes shared
//! by the API and store layers.
mod permission;
mod role;
mod user;

pub use permission::Permission;
pub use role::{Role, RoleWithPermissions};
pub use user::{User, UserWithRoles};
