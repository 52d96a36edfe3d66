//! Domain layer for the storefront backend.
//!
//! This crate provides the business rules on top of the persistence gateway:
//! - Cart aggregate: upsert-increment adds, derived totals, idempotent removal
//! - Inventory ledger: atomic, optionally floor-guarded stock adjustment
//! - Catalog, user registration and admin product management
//! - Request context carrying cancellation and deadlines into every call

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod context;
pub mod error;
pub mod inventory;
pub mod password;
pub mod users;

pub use admin::{AdminService, CategoryInput, ProductChanges, ProductInput};
pub use cart::{CartLineView, CartService, CartView, ProductCheck};
pub use catalog::CatalogService;
pub use context::RequestContext;
pub use error::{DomainError, Result};
pub use inventory::InventoryLedger;
pub use password::{Argon2Hasher, CredentialHasher};
pub use users::{Registration, UserService};
