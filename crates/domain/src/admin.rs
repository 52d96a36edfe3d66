//! Admin-only product and category management.

use common::{CategoryId, ProductId};
use persistence::{Category, NewCategory, NewProduct, Product, ProductUpdate, Store};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::{DomainError, Result};

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub inventory_count: i32,
}

/// Replacement display fields for an existing product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductChanges {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid("name must not be empty"));
    }
    Ok(name.to_string())
}

/// Prices are stored as `NUMERIC(12,2)`; finer amounts are rejected rather
/// than rounded.
fn valid_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::invalid("price must not be negative"));
    }
    let price = price.normalize();
    if price.scale() > 2 {
        return Err(DomainError::invalid("price must have at most 2 decimal places"));
    }
    Ok(price)
}

/// Empty descriptions are stored as absent.
fn optional_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Creates, updates and deletes catalog entries.
///
/// Stock changes go through [`InventoryLedger`](crate::InventoryLedger), never
/// through this service.
pub struct AdminService<S: Store> {
    store: S,
}

impl<S: Store> AdminService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create_product(&self, ctx: &RequestContext, input: ProductInput) -> Result<Product> {
        let name = required_name(&input.name)?;
        let price = valid_price(input.price)?;
        if input.inventory_count < 0 {
            return Err(DomainError::invalid("inventory_count must not be negative"));
        }
        self.ensure_category(ctx, input.category_id).await?;

        let product = ctx
            .run(self.store.insert_product(NewProduct {
                category_id: input.category_id,
                name,
                description: optional_text(input.description),
                price,
                inventory_count: input.inventory_count,
            }))
            .await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replaces a product's display fields. The stock count is left as is.
    #[tracing::instrument(skip(self, ctx, changes))]
    pub async fn update_product(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product> {
        let name = required_name(&changes.name)?;
        let price = valid_price(changes.price)?;
        self.ensure_category(ctx, changes.category_id).await?;

        ctx.run(self.store.update_product(
            product_id,
            ProductUpdate {
                category_id: changes.category_id,
                name,
                description: optional_text(changes.description),
                price,
            },
        ))
        .await
    }

    /// Deletes a product along with any cart lines that reference it.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_product(&self, ctx: &RequestContext, product_id: ProductId) -> Result<()> {
        if !ctx.run(self.store.delete_product(product_id)).await? {
            return Err(DomainError::not_found("Product", product_id));
        }
        tracing::info!(%product_id, "product deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        input: CategoryInput,
    ) -> Result<Category> {
        let name = required_name(&input.name)?;
        ctx.run(self.store.insert_category(NewCategory {
            name,
            description: optional_text(input.description),
        }))
        .await
    }

    async fn ensure_category(
        &self,
        ctx: &RequestContext,
        category_id: Option<CategoryId>,
    ) -> Result<()> {
        if let Some(category_id) = category_id
            && !ctx.run(self.store.category_exists(category_id)).await?
        {
            return Err(DomainError::not_found("Category", category_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use persistence::InMemoryStore;

    use super::*;

    fn widget(price: Decimal) -> ProductInput {
        ProductInput {
            category_id: None,
            name: "Widget".to_string(),
            description: Some("  ".to_string()),
            price,
            inventory_count: 4,
        }
    }

    #[tokio::test]
    async fn create_product_validates_fields() {
        let admin = AdminService::new(InMemoryStore::new());
        let ctx = RequestContext::new();

        let negative = admin.create_product(&ctx, widget(Decimal::new(-1, 2))).await;
        assert!(matches!(negative, Err(DomainError::InvalidArgument(_))));

        let mut unnamed = widget(Decimal::ONE);
        unnamed.name = " ".to_string();
        let unnamed = admin.create_product(&ctx, unnamed).await;
        assert!(matches!(unnamed, Err(DomainError::InvalidArgument(_))));

        let mut negative_stock = widget(Decimal::ONE);
        negative_stock.inventory_count = -1;
        let negative_stock = admin.create_product(&ctx, negative_stock).await;
        assert!(matches!(negative_stock, Err(DomainError::InvalidArgument(_))));

        let fractional_cent = admin.create_product(&ctx, widget(Decimal::new(10555, 3))).await;
        assert!(matches!(fractional_cent, Err(DomainError::InvalidArgument(_))));

        let trailing_zeros = admin
            .create_product(&ctx, widget(Decimal::new(10500, 3)))
            .await
            .unwrap();
        assert_eq!(trailing_zeros.price, Decimal::new(1050, 2));

        let free = admin.create_product(&ctx, widget(Decimal::ZERO)).await.unwrap();
        assert_eq!(free.price, Decimal::ZERO);
        assert_eq!(free.description, None);
        assert_eq!(free.inventory_count, 4);
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let admin = AdminService::new(InMemoryStore::new());
        let mut input = widget(Decimal::ONE);
        input.category_id = Some(CategoryId::new());

        let result = admin.create_product(&RequestContext::new(), input).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "Category",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn update_keeps_stock_and_delete_is_not_idempotent() {
        let admin = AdminService::new(InMemoryStore::new());
        let ctx = RequestContext::new();
        let product = admin
            .create_product(&ctx, widget(Decimal::ONE))
            .await
            .unwrap();

        let updated = admin
            .update_product(
                &ctx,
                product.id,
                ProductChanges {
                    category_id: None,
                    name: "Gadget".to_string(),
                    description: None,
                    price: Decimal::TWO,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.inventory_count, 4);

        admin.delete_product(&ctx, product.id).await.unwrap();
        let again = admin.delete_product(&ctx, product.id).await;
        assert!(matches!(again, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_category_is_conflict() {
        let admin = AdminService::new(InMemoryStore::new());
        let ctx = RequestContext::new();
        let tea = || CategoryInput {
            name: "Tea".to_string(),
            description: None,
        };

        admin.create_category(&ctx, tea()).await.unwrap();
        let result = admin.create_category(&ctx, tea()).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }
}
