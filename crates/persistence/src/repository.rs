use async_trait::async_trait;
use common::{CategoryId, ProductId, UserId};

use crate::{
    Category, CartLineDetail, NewCategory, NewProduct, NewUser, Product, ProductQuery,
    ProductUpdate, Result, StockGuard, User,
};

/// Storage for per-user cart lines.
///
/// Implementations must keep at most one row per (user, product) pair, even
/// under concurrent writers.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Inserts a line with `quantity`, or adds `quantity` to the existing line,
    /// in a single atomic write.
    ///
    /// Returns the line's quantity after the write. Fails with `NotFound` if
    /// the user or product does not exist.
    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32>;

    /// Returns every line for the user, most recently added first.
    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Vec<CartLineDetail>>;

    /// Deletes one line. Succeeds whether or not the line existed.
    ///
    /// Returns the number of rows removed.
    async fn delete_cart_line(&self, user_id: UserId, product_id: ProductId) -> Result<u64>;

    /// Deletes every line for the user. Succeeds on an empty cart.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64>;
}

/// Storage for the product stock counter.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Atomically applies `inventory_count += delta` and returns the new count.
    ///
    /// The guard is evaluated inside the same write, so it holds even when
    /// adjustments race. Fails with `NotFound` if the product does not exist
    /// and with `InsufficientStock` if the guard rejects the change.
    async fn adjust_inventory(
        &self,
        product_id: ProductId,
        delta: i32,
        guard: StockGuard,
    ) -> Result<i32>;
}

/// Storage for products and categories.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn product_exists(&self, product_id: ProductId) -> Result<bool>;

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Lists products, newest first.
    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Replaces a product's display fields. Never touches the stock counter.
    async fn update_product(&self, product_id: ProductId, update: ProductUpdate)
    -> Result<Product>;

    /// Returns false if there was nothing to delete.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool>;

    /// Lists every category ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn category_exists(&self, category_id: CategoryId) -> Result<bool>;

    /// Fails with `Conflict` when the name is taken.
    async fn insert_category(&self, category: NewCategory) -> Result<Category>;
}

/// Storage for registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Everything the storefront needs from a backing store.
pub trait Store:
    CartRepository + InventoryRepository + CatalogRepository + UserRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: CartRepository + InventoryRepository + CatalogRepository + UserRepository + Clone + 'static
{
}
