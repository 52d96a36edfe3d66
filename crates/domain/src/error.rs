//! Domain error types.

use common::ProductId;
use persistence::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The write collides with existing state, e.g. a duplicate email.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A guarded stock change would have left inventory below zero.
    #[error(
        "Insufficient stock for product {product_id}: {available} available, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// The backing store failed or could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] StoreError),

    /// The caller cancelled the operation before it finished.
    #[error("Operation canceled")]
    Canceled,

    /// The operation's deadline passed before it finished.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// An unexpected failure inside this process.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidArgument(message.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Conflict(message) => DomainError::Conflict(message),
            StoreError::InsufficientStock {
                product_id,
                available,
                change,
            } => DomainError::InsufficientStock {
                product_id,
                available,
                requested: change,
            },
            StoreError::OutOfRange(message) => DomainError::InvalidArgument(message),
            other => DomainError::Unavailable(other),
        }
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let not_found: DomainError = StoreError::NotFound {
            entity: "Product",
            id: "p".to_string(),
        }
        .into();
        assert!(matches!(
            not_found,
            DomainError::NotFound {
                entity: "Product",
                ..
            }
        ));

        let conflict: DomainError = StoreError::Conflict("taken".to_string()).into();
        assert!(matches!(conflict, DomainError::Conflict(_)));

        let range: DomainError = StoreError::OutOfRange("overflow".to_string()).into();
        assert!(matches!(range, DomainError::InvalidArgument(_)));

        let corrupt: DomainError = StoreError::Corrupt("role".to_string()).into();
        assert!(matches!(corrupt, DomainError::Unavailable(_)));
    }

    #[test]
    fn insufficient_stock_keeps_its_numbers() {
        let product_id = ProductId::new();
        let err: DomainError = StoreError::InsufficientStock {
            product_id,
            available: 3,
            change: -5,
        }
        .into();

        match err {
            DomainError::InsufficientStock {
                product_id: id,
                available,
                requested,
            } => {
                assert_eq!(id, product_id);
                assert_eq!(available, 3);
                assert_eq!(requested, -5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
