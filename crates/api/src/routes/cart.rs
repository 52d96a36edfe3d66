//! Shopping cart endpoints for the authenticated user.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use common::ProductId;
use domain::{CartView, RequestContext};
use persistence::Store;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// GET /api/v1/store/cart
#[tracing::instrument(skip(state, ctx, caller), fields(user_id = %caller.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AuthUser(caller): AuthUser,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.get_cart(&ctx, caller.user_id).await?))
}

/// POST /api/v1/store/cart/items: add to the quantity already in the cart.
#[tracing::instrument(skip(state, ctx, caller, body), fields(user_id = %caller.user_id))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AuthUser(caller): AuthUser,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    state
        .cart
        .add_item(&ctx, caller.user_id, req.product_id, req.quantity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/store/cart/items/{product_id}
#[tracing::instrument(skip(state, ctx, caller), fields(user_id = %caller.user_id))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AuthUser(caller): AuthUser,
    product_id: Result<Path<ProductId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(product_id) = product_id?;
    state
        .cart
        .remove_item(&ctx, caller.user_id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/store/cart
#[tracing::instrument(skip(state, ctx, caller), fields(user_id = %caller.user_id))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AuthUser(caller): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.cart.clear(&ctx, caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
