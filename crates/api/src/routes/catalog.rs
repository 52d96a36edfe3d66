//! Public catalog browsing endpoints.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::{CategoryId, ProductId};
use domain::RequestContext;
use persistence::{Category, Product, Store};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category_id: Option<CategoryId>,
}

/// GET /api/v1/catalog/products: one page of products, newest first.
#[tracing::instrument(skip(state, ctx))]
pub async fn list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    params: Result<Query<ProductListParams>, QueryRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Query(params) = params?;
    let products = state
        .catalog
        .list_products(&ctx, params.page, params.limit, params.category_id)
        .await?;
    Ok(Json(products))
}

/// GET /api/v1/catalog/products/{id}
#[tracing::instrument(skip(state, ctx))]
pub async fn get_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(product_id) = id?;
    Ok(Json(state.catalog.get_product(&ctx, product_id).await?))
}

/// GET /api/v1/catalog/categories
#[tracing::instrument(skip(state, ctx))]
pub async fn list_categories<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories(&ctx).await?))
}
