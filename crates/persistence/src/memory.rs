use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    CartLineDetail, CartRepository, CatalogRepository, Category, InventoryRepository, NewCategory,
    NewProduct, NewUser, Product, ProductQuery, ProductUpdate, Result, StockGuard, StoreError,
    User, UserRepository,
};

#[derive(Debug, Clone)]
struct StoredLine {
    quantity: i32,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct StoredProduct {
    product: Product,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, StoredProduct>,
    cart: HashMap<(UserId, ProductId), StoredLine>,
    next_seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// In-memory store for tests, benches and local development.
///
/// Each operation runs under one write (or read) lock acquisition, which
/// gives the same all-or-nothing behaviour as a single SQL statement. The
/// same foreign-key and uniqueness rules as the PostgreSQL schema apply.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    contention: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write yield to the scheduler while it holds the lock.
    ///
    /// The lock still serializes each operation, so this does not interleave
    /// writers inside the store. It widens the window between separate store
    /// calls, which surfaces lost updates in any caller that splits a
    /// read-modify-write across operations. Races inside a single statement
    /// are covered by the PostgreSQL suite.
    pub fn set_contention(&self, enabled: bool) {
        self.contention.store(enabled, Ordering::SeqCst);
    }

    /// Configures every operation to fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of cart lines across all users.
    pub async fn cart_line_count(&self) -> usize {
        self.state.read().await.cart.len()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = State::default();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn contend(&self) {
        if self.contention.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::not_found("User", user_id));
        }
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::not_found("Product", product_id));
        }

        let current = state.cart.get(&(user_id, product_id)).map(|l| l.quantity);
        self.contend().await;

        let new_quantity = match current {
            Some(existing) => existing.checked_add(quantity).ok_or_else(|| {
                StoreError::OutOfRange(format!("cart quantity {existing} + {quantity}"))
            })?,
            None => quantity,
        };

        let seq = state.next_seq();
        state
            .cart
            .entry((user_id, product_id))
            .and_modify(|line| line.quantity = new_quantity)
            .or_insert(StoredLine {
                quantity: new_quantity,
                created_at: Utc::now(),
                seq,
            });

        Ok(new_quantity)
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Vec<CartLineDetail>> {
        self.check_available()?;
        let state = self.state.read().await;

        let mut lines: Vec<_> = state
            .cart
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .filter_map(|((_, product_id), line)| {
                let product = &state.products.get(product_id)?.product;
                Some((
                    line.seq,
                    CartLineDetail {
                        product_id: *product_id,
                        product_name: product.name.clone(),
                        unit_price: product.price,
                        quantity: line.quantity,
                        added_at: line.created_at,
                    },
                ))
            })
            .collect();

        lines.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(lines.into_iter().map(|(_, detail)| detail).collect())
    }

    async fn delete_cart_line(&self, user_id: UserId, product_id: ProductId) -> Result<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        Ok(state.cart.remove(&(user_id, product_id)).map_or(0, |_| 1))
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let before = state.cart.len();
        state.cart.retain(|(owner, _), _| *owner != user_id);
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn adjust_inventory(
        &self,
        product_id: ProductId,
        delta: i32,
        guard: StockGuard,
    ) -> Result<i32> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let current = state
            .products
            .get(&product_id)
            .map(|p| p.product.inventory_count)
            .ok_or_else(|| StoreError::not_found("Product", product_id))?;
        self.contend().await;

        let new_count = current.checked_add(delta).ok_or_else(|| {
            StoreError::OutOfRange(format!("inventory count {current} + {delta}"))
        })?;

        if guard.enforces_floor() && new_count < 0 {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: current,
                change: delta,
            });
        }

        if let Some(stored) = state.products.get_mut(&product_id) {
            stored.product.inventory_count = new_count;
            stored.product.updated_at = Utc::now();
        }

        Ok(new_count)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn product_exists(&self, product_id: ProductId) -> Result<bool> {
        self.check_available()?;
        Ok(self.state.read().await.products.contains_key(&product_id))
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.products.get(&product_id).map(|p| p.product.clone()))
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        self.check_available()?;
        let state = self.state.read().await;

        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| match query.category_id {
                Some(category_id) => p.product.category_id == Some(category_id),
                None => true,
            })
            .collect();
        products.sort_by(|a, b| b.seq.cmp(&a.seq));

        Ok(products
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .map(|p| p.product.clone())
            .collect())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if let Some(category_id) = product.category_id
            && !state.categories.contains_key(&category_id)
        {
            return Err(StoreError::not_found("Category", category_id));
        }

        let now = Utc::now();
        let stored = Product {
            id: ProductId::new(),
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price: product.price,
            inventory_count: product.inventory_count,
            created_at: now,
            updated_at: now,
        };
        let seq = state.next_seq();
        state.products.insert(
            stored.id,
            StoredProduct {
                product: stored.clone(),
                seq,
            },
        );

        Ok(stored)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if let Some(category_id) = update.category_id
            && !state.categories.contains_key(&category_id)
        {
            return Err(StoreError::not_found("Category", category_id));
        }

        let stored = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("Product", product_id))?;

        stored.product.category_id = update.category_id;
        stored.product.name = update.name;
        stored.product.description = update.description;
        stored.product.price = update.price;
        stored.product.updated_at = Utc::now();

        Ok(stored.product.clone())
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let removed = state.products.remove(&product_id).is_some();
        if removed {
            state.cart.retain(|(_, product), _| *product != product_id);
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_exists(&self, category_id: CategoryId) -> Result<bool> {
        self.check_available()?;
        Ok(self.state.read().await.categories.contains_key(&category_id))
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if state.categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                category.name
            )));
        }

        let now = Utc::now();
        let stored = Category {
            id: CategoryId::new(),
            name: category.name,
            description: category.description,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }

        let now = Utc::now();
        let stored = User {
            id: UserId::new(),
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.check_available()?;
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use common::Role;
    use rust_decimal::Decimal;

    use super::*;

    async fn seed_user(store: &InMemoryStore) -> UserId {
        store
            .insert_user(NewUser {
                full_name: "Test User".to_string(),
                email: format!("{}@example.com", UserId::new()),
                password_hash: "hash".to_string(),
                role: Role::Customer,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_product(store: &InMemoryStore, name: &str, inventory: i32) -> ProductId {
        store
            .insert_product(NewProduct {
                category_id: None,
                name: name.to_string(),
                description: None,
                price: Decimal::new(250, 2),
                inventory_count: inventory,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn upsert_inserts_then_increments() {
        let store = InMemoryStore::new();
        let user = seed_user(&store).await;
        let product = seed_product(&store, "Widget", 10).await;

        assert_eq!(store.upsert_cart_line(user, product, 2).await.unwrap(), 2);
        assert_eq!(store.upsert_cart_line(user, product, 3).await.unwrap(), 5);
        assert_eq!(store.cart_line_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_unknown_product_is_not_found() {
        let store = InMemoryStore::new();
        let user = seed_user(&store).await;

        let result = store.upsert_cart_line(user, ProductId::new(), 1).await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                entity: "Product",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cart_is_ordered_most_recent_first() {
        let store = InMemoryStore::new();
        let user = seed_user(&store).await;
        let first = seed_product(&store, "First", 1).await;
        let second = seed_product(&store, "Second", 1).await;

        store.upsert_cart_line(user, first, 1).await.unwrap();
        store.upsert_cart_line(user, second, 1).await.unwrap();
        // A repeat add does not change a line's position.
        store.upsert_cart_line(user, first, 1).await.unwrap();

        let lines = store.find_cart_by_user(user).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, second);
        assert_eq!(lines[1].product_id, first);
        assert_eq!(lines[1].quantity, 2);
    }

    #[tokio::test]
    async fn delete_missing_line_is_a_no_op() {
        let store = InMemoryStore::new();
        let user = seed_user(&store).await;
        let product = seed_product(&store, "Widget", 1).await;

        assert_eq!(store.delete_cart_line(user, product).await.unwrap(), 0);
        store.upsert_cart_line(user, product, 1).await.unwrap();
        assert_eq!(store.delete_cart_line(user, product).await.unwrap(), 1);
        assert_eq!(store.clear_cart(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn guarded_adjustment_rejects_negative_result() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Widget", 3).await;

        let result = store
            .adjust_inventory(product, -5, StockGuard::NonNegative)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { available: 3, .. })
        ));

        let stored = store.find_product(product).await.unwrap().unwrap();
        assert_eq!(stored.inventory_count, 3);
    }

    #[tokio::test]
    async fn unguarded_adjustment_may_go_negative() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Widget", 3).await;

        let count = store
            .adjust_inventory(product, -5, StockGuard::AllowNegative)
            .await
            .unwrap();
        assert_eq!(count, -2);
    }

    #[tokio::test]
    async fn adjustment_overflow_is_out_of_range() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Widget", i32::MAX).await;

        let result = store
            .adjust_inventory(product, 1, StockGuard::NonNegative)
            .await;
        assert!(matches!(result, Err(StoreError::OutOfRange(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = InMemoryStore::new();
        let new_user = NewUser {
            full_name: "A".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Customer,
        };

        store.insert_user(new_user.clone()).await.unwrap();
        let result = store.insert_user(new_user).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_product_drops_its_cart_lines() {
        let store = InMemoryStore::new();
        let user = seed_user(&store).await;
        let product = seed_product(&store, "Widget", 1).await;
        store.upsert_cart_line(user, product, 1).await.unwrap();

        assert!(store.delete_product(product).await.unwrap());
        assert!(!store.delete_product(product).await.unwrap());
        assert_eq!(store.cart_line_count().await, 0);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let result = store.list_categories().await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
