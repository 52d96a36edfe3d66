use std::time::Duration;

use async_trait::async_trait;
use common::{CategoryId, ProductId, Role, UserId};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    CartLineDetail, CartRepository, CatalogRepository, Category, InventoryRepository, NewCategory,
    NewProduct, NewUser, Product, ProductQuery, ProductUpdate, Result, StockGuard, StoreError,
    User, UserRepository,
};

const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed store.
///
/// Every mutation is a single statement, so atomicity comes from the
/// database rather than from locks held in this process.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url` and wraps it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(300))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            category_id: row
                .try_get::<Option<Uuid>, _>("category_id")?
                .map(CategoryId::from_uuid),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            inventory_count: row.try_get("inventory_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role
                .parse::<Role>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Translates constraint and range failures into store errors.
///
/// `on_constraint` maps a violated constraint name to a domain-level error;
/// anything it does not recognise stays a database error.
fn classify(e: sqlx::Error, on_constraint: impl Fn(&str) -> Option<StoreError>) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(mapped) = db_err.constraint().and_then(&on_constraint) {
            return mapped;
        }
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return StoreError::OutOfRange(db_err.message().to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32> {
        let new_quantity: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| match constraint {
                "cart_items_product_id_fkey" => Some(StoreError::not_found("Product", product_id)),
                "cart_items_user_id_fkey" => Some(StoreError::not_found("User", user_id)),
                _ => None,
            })
        })?;

        Ok(new_quantity)
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Vec<CartLineDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.product_id, ci.quantity, ci.created_at, p.name, p.price
            FROM cart_items ci
            JOIN products p ON ci.product_id = p.id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at DESC, ci.product_id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartLineDetail {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    product_name: row.try_get("name")?,
                    unit_price: row.try_get("price")?,
                    quantity: row.try_get("quantity")?,
                    added_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn delete_cart_line(&self, user_id: UserId, product_id: ProductId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl InventoryRepository for PostgresStore {
    async fn adjust_inventory(
        &self,
        product_id: ProductId,
        delta: i32,
        guard: StockGuard,
    ) -> Result<i32> {
        // The outer SELECT reads the pre-update snapshot, which tells a
        // missing product apart from a rejected guard without a second trip.
        let row = sqlx::query(
            r#"
            WITH updated AS (
                UPDATE products
                SET inventory_count = inventory_count + $2, updated_at = NOW()
                WHERE id = $1 AND (NOT $3 OR inventory_count + $2 >= 0)
                RETURNING inventory_count
            )
            SELECT
                (SELECT inventory_count FROM updated) AS new_count,
                (SELECT inventory_count FROM products WHERE id = $1) AS previous_count
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(delta)
        .bind(guard.enforces_floor())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, |_| None))?;

        let new_count: Option<i32> = row.try_get("new_count")?;
        let previous_count: Option<i32> = row.try_get("previous_count")?;

        match (new_count, previous_count) {
            (Some(count), _) => Ok(count),
            (None, Some(available)) => Err(StoreError::InsufficientStock {
                product_id,
                available,
                change: delta,
            }),
            (None, None) => Err(StoreError::not_found("Product", product_id)),
        }
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn product_exists(&self, product_id: ProductId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price, inventory_count, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price, inventory_count, created_at, updated_at
            FROM products
            WHERE ($1::uuid IS NULL OR category_id = $1)
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.category_id.map(|id| id.as_uuid()))
        .bind(query.page.limit())
        .bind(query.page.offset())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let category_id = product.category_id;
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, category_id, name, description, price, inventory_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, category_id, name, description, price, inventory_count, created_at, updated_at
            "#,
        )
        .bind(ProductId::new().as_uuid())
        .bind(category_id.map(|id| id.as_uuid()))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.inventory_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| match (constraint, category_id) {
                ("products_category_id_fkey", Some(id)) => {
                    Some(StoreError::not_found("Category", id))
                }
                _ => None,
            })
        })?;

        Self::row_to_product(row)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        let category_id = update.category_id;
        let row = sqlx::query(
            r#"
            UPDATE products
            SET category_id = $2, name = $3, description = $4, price = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, category_id, name, description, price, inventory_count, created_at, updated_at
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(category_id.map(|id| id.as_uuid()))
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| match (constraint, category_id) {
                ("products_category_id_fkey", Some(id)) => {
                    Some(StoreError::not_found("Category", id))
                }
                _ => None,
            })
        })?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::not_found("Product", product_id)),
        }
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn category_exists(&self, category_id: CategoryId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        let row = sqlx::query(
            r#"
            INSERT INTO categories (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(CategoryId::new().as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| {
                (constraint == "categories_name_key").then(|| {
                    StoreError::Conflict(format!("category '{}' already exists", category.name))
                })
            })
        })?;

        Self::row_to_category(row)
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, full_name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(UserId::new().as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| {
                (constraint == "users_email_key")
                    .then(|| StoreError::Conflict("email already in use".to_string()))
            })
        })?;

        Self::row_to_user(row)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }
}
