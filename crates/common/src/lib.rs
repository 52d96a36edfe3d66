//! Identifier newtypes and roles shared by every storefront crate.

pub mod types;

pub use types::{CategoryId, ParseRoleError, ProductId, Role, UserId};
