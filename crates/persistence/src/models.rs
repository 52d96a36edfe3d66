//! Rows stored by the gateway and the inputs used to create them.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId, Role, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registered user, including the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// A catalog product.
///
/// `inventory_count` is only ever changed through
/// [`InventoryRepository::adjust_inventory`](crate::InventoryRepository::adjust_inventory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub inventory_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub inventory_count: i32,
}

/// Replacement display fields for an existing product. Stock is not included.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

/// A cart line joined with the product's current name and price.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineDetail {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Bound applied to an inventory adjustment inside the atomic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockGuard {
    /// Reject the adjustment if the resulting count would be negative.
    #[default]
    NonNegative,
    /// Apply the adjustment regardless of the result's sign.
    AllowNegative,
}

impl StockGuard {
    pub fn enforces_floor(&self) -> bool {
        matches!(self, StockGuard::NonNegative)
    }
}
