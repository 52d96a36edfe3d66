//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use domain::{
    AdminService, CartService, CatalogService, CredentialHasher, InventoryLedger, ProductCheck,
    UserService,
};
use persistence::Store;

use crate::auth::TokenVerifier;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub cart: CartService<S>,
    pub inventory: InventoryLedger<S>,
    pub catalog: CatalogService<S>,
    pub users: UserService<S>,
    pub admin: AdminService<S>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Deadline given to every request's context.
    pub request_timeout: Duration,
}

impl<S: Store> AppState<S> {
    pub fn new(
        store: S,
        hasher: Arc<dyn CredentialHasher>,
        verifier: Arc<dyn TokenVerifier>,
        product_check: ProductCheck,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cart: CartService::new(store.clone()).with_product_check(product_check),
            inventory: InventoryLedger::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            users: UserService::new(store.clone(), hasher),
            admin: AdminService::new(store),
            verifier,
            request_timeout,
        }
    }
}
