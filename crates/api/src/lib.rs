//! HTTP API server for the storefront backend.
//!
//! Provides REST endpoints for registration, catalog browsing, the shopping
//! cart and admin product management, with structured logging (tracing) and
//! Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use domain::Argon2Hasher;
use metrics_exporter_prometheus::PrometheusHandle;
use persistence::Store;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use auth::TokenVerifier;
use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/users/register", post(routes::users::register::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/catalog/products", get(routes::catalog::list_products::<S>))
        .route("/catalog/products/{id}", get(routes::catalog::get_product::<S>))
        .route(
            "/catalog/categories",
            get(routes::catalog::list_categories::<S>),
        )
        .route(
            "/store/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/store/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/store/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route("/admin/products", post(routes::admin::create_product::<S>))
        .route(
            "/admin/products/{id}",
            put(routes::admin::update_product::<S>).delete(routes::admin::delete_product::<S>),
        )
        .route(
            "/admin/products/{id}/inventory",
            patch(routes::admin::adjust_inventory::<S>),
        )
        .route(
            "/admin/categories",
            post(routes::admin::create_category::<S>),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_context::<S>,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/ping", get(routes::health::ping))
        .nest("/api/v1", api)
        .merge(metrics_router)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Creates the default application state: Argon2id hashing and the
/// configured cart product check and request timeout.
pub fn create_default_state<S: Store>(
    store: S,
    config: &Config,
    verifier: Arc<dyn TokenVerifier>,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(
        store,
        Arc::new(Argon2Hasher::default()),
        verifier,
        config.cart_product_check,
        config.request_timeout,
    ))
}
