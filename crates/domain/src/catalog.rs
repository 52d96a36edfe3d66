//! Read-only catalog queries.

use common::{CategoryId, ProductId};
use persistence::{Category, Page, Product, ProductQuery, Store};

use crate::context::RequestContext;
use crate::error::{DomainError, Result};

/// Browses products and categories.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists one page of products, newest first.
    ///
    /// Out-of-range paging values are clamped rather than rejected.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn list_products(
        &self,
        ctx: &RequestContext,
        page: Option<i64>,
        limit: Option<i64>,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Product>> {
        let mut query = ProductQuery::new(Page::new(page, limit));
        if let Some(category_id) = category_id {
            query = query.category(category_id);
        }
        ctx.run(self.store.list_products(query)).await
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_product(&self, ctx: &RequestContext, product_id: ProductId) -> Result<Product> {
        ctx.run(self.store.find_product(product_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn list_categories(&self, ctx: &RequestContext) -> Result<Vec<Category>> {
        ctx.run(self.store.list_categories()).await
    }
}

#[cfg(test)]
mod tests {
    use persistence::{CatalogRepository, InMemoryStore, NewProduct};
    use rust_decimal::Decimal;

    use super::*;

    async fn seed(store: &InMemoryStore, count: usize) {
        for i in 0..count {
            store
                .insert_product(NewProduct {
                    category_id: None,
                    name: format!("Product {i}"),
                    description: None,
                    price: Decimal::new(100, 2),
                    inventory_count: 1,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn bad_paging_values_fall_back_to_defaults() {
        let store = InMemoryStore::new();
        seed(&store, 25).await;
        let catalog = CatalogService::new(store);
        let ctx = RequestContext::new();

        let page = catalog
            .list_products(&ctx, Some(0), Some(500), None)
            .await
            .unwrap();
        assert_eq!(page.len(), 20);

        let second = catalog
            .list_products(&ctx, Some(2), None, None)
            .await
            .unwrap();
        assert_eq!(second.len(), 5);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = InMemoryStore::new();
        seed(&store, 3).await;
        let catalog = CatalogService::new(store);

        let names: Vec<_> = catalog
            .list_products(&RequestContext::new(), None, None, None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Product 2", "Product 1", "Product 0"]);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let result = catalog
            .get_product(&RequestContext::new(), ProductId::new())
            .await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "Product",
                ..
            })
        ));
    }
}
