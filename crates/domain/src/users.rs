//! User registration and lookup.

use std::sync::Arc;

use common::{Role, UserId};
use persistence::{NewUser, Store, User};
use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::{DomainError, Result};
use crate::password::CredentialHasher;

const MIN_PASSWORD_LEN: usize = 8;

/// Input for registering a new customer.
#[derive(Clone, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Registration {
    /// Trims the name, normalizes the email and checks password length.
    fn validate(self) -> Result<Registration> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::invalid("full_name must not be empty"));
        }

        let email = self.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::invalid("email must be a valid address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Registration {
            full_name,
            email,
            password: self.password,
        })
    }
}

/// Registers and looks up users.
pub struct UserService<S: Store> {
    store: S,
    hasher: Arc<dyn CredentialHasher>,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Creates a customer account.
    ///
    /// Email uniqueness is enforced by the store, so two racing registrations
    /// for the same address produce exactly one user and one `Conflict`.
    #[tracing::instrument(skip(self, ctx, registration), fields(email = %registration.email))]
    pub async fn register(&self, ctx: &RequestContext, registration: Registration) -> Result<User> {
        let registration = registration.validate()?;
        ctx.check()?;

        let hasher = self.hasher.clone();
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("password hashing task failed: {e}")))??;

        let user = ctx
            .run(self.store.insert_user(NewUser {
                full_name: registration.full_name,
                email: registration.email,
                password_hash,
                role: Role::Customer,
            }))
            .await?;

        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %user.id, "user registered");

        Ok(user)
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<User> {
        ctx.run(self.store.find_user_by_id(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }
}
