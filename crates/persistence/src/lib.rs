//! Persistence gateway for the storefront.
//!
//! Repository traits describe each storage concern; [`PostgresStore`] and
//! [`InMemoryStore`] implement all of them. Additive writes (cart quantity,
//! inventory count) are single atomic operations, never a read followed by a
//! write.

pub mod error;
pub mod memory;
pub mod models;
pub mod page;
pub mod postgres;
pub mod repository;

pub use common::{CategoryId, ProductId, Role, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{
    CartLineDetail, Category, NewCategory, NewProduct, NewUser, Product, ProductUpdate,
    StockGuard, User,
};
pub use page::{DEFAULT_LIMIT, MAX_LIMIT, Page, ProductQuery};
pub use postgres::PostgresStore;
pub use repository::{
    CartRepository, CatalogRepository, InventoryRepository, Store, UserRepository,
};
