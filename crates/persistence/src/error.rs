use common::ProductId;
use thiserror::Error;

/// Errors that can occur when talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// A guarded inventory adjustment would have left stock below zero.
    /// The stored count is unchanged.
    #[error("Insufficient stock for product {product_id}: {available} available, change {change}")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        change: i32,
    },

    /// Arithmetic on a stored counter left the representable range.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A stored value could not be decoded into a domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
