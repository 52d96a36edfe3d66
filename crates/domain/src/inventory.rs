//! Stock ledger for products.

use common::ProductId;
use persistence::{StockGuard, Store};

use crate::context::RequestContext;
use crate::error::{DomainError, Result};

/// Applies signed stock changes to products.
///
/// Every change is one atomic write in the store; concurrent adjustments to
/// the same product all land and never overwrite each other.
pub struct InventoryLedger<S: Store> {
    store: S,
}

impl<S: Store> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `change` to the product's stock, refusing to go below zero.
    ///
    /// On `InsufficientStock` the stored count is unchanged.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn adjust(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        change: i32,
    ) -> Result<i32> {
        self.apply(ctx, product_id, change, StockGuard::NonNegative)
            .await
    }

    /// Adds `change` to the product's stock even if the result is negative.
    ///
    /// Used for corrections and backorders, where a negative count is a
    /// meaningful state.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn adjust_allow_negative(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        change: i32,
    ) -> Result<i32> {
        self.apply(ctx, product_id, change, StockGuard::AllowNegative)
            .await
    }

    async fn apply(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        change: i32,
        guard: StockGuard,
    ) -> Result<i32> {
        if change == 0 {
            return Err(DomainError::invalid("change must be non-zero"));
        }

        let result = ctx
            .run(self.store.adjust_inventory(product_id, change, guard))
            .await;

        match &result {
            Ok(new_count) => {
                metrics::counter!("inventory_adjustments_total", "outcome" => "applied")
                    .increment(1);
                tracing::info!(%product_id, change, new_count, "inventory adjusted");
            }
            Err(DomainError::InsufficientStock { available, .. }) => {
                metrics::counter!("inventory_adjustments_total", "outcome" => "rejected")
                    .increment(1);
                metrics::counter!("inventory_insufficient_stock_total").increment(1);
                tracing::warn!(%product_id, change, available, "inventory adjustment rejected");
            }
            Err(_) => {
                metrics::counter!("inventory_adjustments_total", "outcome" => "failed")
                    .increment(1);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use persistence::{CatalogRepository, InMemoryStore, NewProduct};
    use rust_decimal::Decimal;

    use super::*;

    async fn product_with_stock(store: &InMemoryStore, count: i32) -> ProductId {
        store
            .insert_product(NewProduct {
                category_id: None,
                name: "Widget".to_string(),
                description: None,
                price: Decimal::new(100, 2),
                inventory_count: count,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn zero_change_is_rejected() {
        let store = InMemoryStore::new();
        let product = product_with_stock(&store, 3).await;
        let ledger = InventoryLedger::new(store);

        let result = ledger.adjust(&RequestContext::new(), product, 0).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn guarded_decrement_below_zero_keeps_stock() {
        let store = InMemoryStore::new();
        let product = product_with_stock(&store, 3).await;
        let ledger = InventoryLedger::new(store.clone());
        let ctx = RequestContext::new();

        let result = ledger.adjust(&ctx, product, -5).await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                available: 3,
                requested: -5,
                ..
            })
        ));

        let stored = store.find_product(product).await.unwrap().unwrap();
        assert_eq!(stored.inventory_count, 3);
    }

    #[tokio::test]
    async fn unguarded_decrement_may_go_negative() {
        let store = InMemoryStore::new();
        let product = product_with_stock(&store, 3).await;
        let ledger = InventoryLedger::new(store);

        let count = ledger
            .adjust_allow_negative(&RequestContext::new(), product, -5)
            .await
            .unwrap();
        assert_eq!(count, -2);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let ledger = InventoryLedger::new(InMemoryStore::new());
        let result = ledger
            .adjust(&RequestContext::new(), ProductId::new(), 1)
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
