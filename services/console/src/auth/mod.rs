//! Authentication and authorization for the console API.
//!
//! # Purpose
//! Session token minting/verification, password hashing, the permission
//! catalog, and the per-request guard that enforces route permissions.
pub mod guard;
pub mod keys;
pub mod login;
pub mod password;
pub mod rbac;
pub mod token;
