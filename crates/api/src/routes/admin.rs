//! Admin-only product, inventory and category endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use common::ProductId;
use domain::{CategoryInput, ProductChanges, ProductInput, RequestContext};
use persistence::{Category, Product, Store};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdjustInventoryRequest {
    pub change: i32,
}

#[derive(Debug, Serialize)]
pub struct AdjustInventoryResponse {
    pub new_inventory_count: i32,
}

/// POST /api/v1/admin/products
#[tracing::instrument(skip(state, ctx, admin, body), fields(admin_id = %admin.user_id))]
pub async fn create_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AdminUser(admin): AdminUser,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(input) = body?;
    let product = state.admin.create_product(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/v1/admin/products/{id}: replace display fields, keeping stock.
#[tracing::instrument(skip(state, ctx, admin, body), fields(admin_id = %admin.user_id))]
pub async fn update_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AdminUser(admin): AdminUser,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<ProductChanges>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(product_id) = id?;
    let Json(changes) = body?;
    Ok(Json(
        state
            .admin
            .update_product(&ctx, product_id, changes)
            .await?,
    ))
}

/// DELETE /api/v1/admin/products/{id}
#[tracing::instrument(skip(state, ctx, admin), fields(admin_id = %admin.user_id))]
pub async fn delete_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AdminUser(admin): AdminUser,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(product_id) = id?;
    state.admin.delete_product(&ctx, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/admin/products/{id}/inventory: guarded stock change.
#[tracing::instrument(skip(state, ctx, admin, body), fields(admin_id = %admin.user_id))]
pub async fn adjust_inventory<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AdminUser(admin): AdminUser,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<AdjustInventoryRequest>, JsonRejection>,
) -> Result<Json<AdjustInventoryResponse>, ApiError> {
    let Path(product_id) = id?;
    let Json(req) = body?;
    let new_inventory_count = state
        .inventory
        .adjust(&ctx, product_id, req.change)
        .await?;
    Ok(Json(AdjustInventoryResponse {
        new_inventory_count,
    }))
}

/// POST /api/v1/admin/categories
#[tracing::instrument(skip(state, ctx, admin, body), fields(admin_id = %admin.user_id))]
pub async fn create_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AdminUser(admin): AdminUser,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let Json(input) = body?;
    let category = state.admin.create_category(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
