//! The per-user cart: additive adds, derived totals, idempotent removal.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use persistence::{CartLineDetail, Store};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::{DomainError, Result};

/// Precondition applied to a product before it is added to a cart.
///
/// None of these reserve stock; `InStock` only rejects adds that the current
/// count could not cover at the time of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductCheck {
    /// Rely on the store's referential integrity alone.
    #[default]
    None,
    /// Reject adds for products that do not exist.
    Exists,
    /// Reject adds for a quantity above the product's current stock.
    InStock,
}

impl std::str::FromStr for ProductCheck {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ProductCheck::None),
            "exists" => Ok(ProductCheck::Exists),
            "in_stock" => Ok(ProductCheck::InStock),
            other => Err(DomainError::invalid(format!(
                "unknown product check '{other}', expected none, exists or in_stock"
            ))),
        }
    }
}

/// One cart line priced at the product's current price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub added_at: DateTime<Utc>,
}

/// A user's cart with totals. Derived on read, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_price: Decimal,
    pub total_items: i64,
}

impl CartView {
    /// Prices every line and accumulates both totals in one pass.
    pub fn from_lines(lines: Vec<CartLineDetail>) -> Self {
        let mut view = CartView {
            items: Vec::with_capacity(lines.len()),
            ..Default::default()
        };

        for line in lines {
            let line_total = line.unit_price * Decimal::from(line.quantity);
            view.total_price += line_total;
            view.total_items += i64::from(line.quantity);
            view.items.push(CartLineView {
                product_id: line.product_id,
                product_name: line.product_name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total,
                added_at: line.added_at,
            });
        }

        view
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Service for managing carts.
pub struct CartService<S: Store> {
    store: S,
    product_check: ProductCheck,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            product_check: ProductCheck::default(),
        }
    }

    pub fn with_product_check(mut self, check: ProductCheck) -> Self {
        self.product_check = check;
        self
    }

    pub fn product_check(&self) -> ProductCheck {
        self.product_check
    }

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// Repeated adds for the same product merge into one line whose quantity
    /// is the sum, even when they race. Returns the line's new quantity.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn add_item(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32> {
        if quantity <= 0 {
            return Err(DomainError::invalid("quantity must be positive"));
        }

        match self.product_check {
            ProductCheck::None => {}
            ProductCheck::Exists => {
                if !ctx.run(self.store.product_exists(product_id)).await? {
                    return Err(DomainError::not_found("Product", product_id));
                }
            }
            ProductCheck::InStock => {
                let product = ctx
                    .run(self.store.find_product(product_id))
                    .await?
                    .ok_or_else(|| DomainError::not_found("Product", product_id))?;
                if product.inventory_count < quantity {
                    return Err(DomainError::InsufficientStock {
                        product_id,
                        available: product.inventory_count,
                        requested: quantity,
                    });
                }
            }
        }

        let new_quantity = ctx
            .run(self.store.upsert_cart_line(user_id, product_id, quantity))
            .await?;

        metrics::counter!("cart_items_added_total").increment(quantity as u64);
        tracing::debug!(%user_id, %product_id, new_quantity, "cart line updated");

        Ok(new_quantity)
    }

    /// Returns the user's cart. A user without lines gets an empty cart.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_cart(&self, ctx: &RequestContext, user_id: UserId) -> Result<CartView> {
        let lines = ctx.run(self.store.find_cart_by_user(user_id)).await?;
        Ok(CartView::from_lines(lines))
    }

    /// Removes a line. Removing a line that is not there is not an error.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn remove_item(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<()> {
        let removed = ctx
            .run(self.store.delete_cart_line(user_id, product_id))
            .await?;
        if removed > 0 {
            metrics::counter!("cart_items_removed_total").increment(removed);
        }
        Ok(())
    }

    /// Empties the user's cart.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn clear(&self, ctx: &RequestContext, user_id: UserId) -> Result<()> {
        let removed = ctx.run(self.store.clear_cart(user_id)).await?;
        if removed > 0 {
            metrics::counter!("cart_items_removed_total").increment(removed);
        }
        Ok(())
    }
}
