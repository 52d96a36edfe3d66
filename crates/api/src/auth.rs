//! Bearer token verification and the authenticated-caller extractors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use common::{Role, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use persistence::Store;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this caller may read data owned by `user_id`.
    pub fn can_access(&self, user_id: UserId) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("admin role required")]
    Forbidden,

    /// The verifier itself is misconfigured or failed.
    #[error("token verification failed: {0}")]
    Internal(String),
}

/// Turns a bearer token into a [`Principal`].
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Claims carried in a signed session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// HS256 JWT verifier. Also issues tokens, for tooling and tests.
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtVerifier {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Signs a token for `principal` that expires after the configured ttl.
    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: principal.user_id,
            role: principal.role,
            exp: now + self.ttl.as_secs() as i64,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("create JWT: {e}")))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::InvalidToken,
                _ => AuthError::Internal(format!("JWT verification: {e}")),
            }
        })?;
        Ok(Principal::new(data.claims.sub, data.claims.role))
    }
}

/// Verifies opaque session tokens against an in-process table.
#[derive(Default)]
pub struct SessionTokenVerifier {
    sessions: RwLock<HashMap<String, Principal>>,
}

impl SessionTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, principal: Principal) {
        self.sessions.write().await.insert(token.into(), principal);
    }

    /// Returns true if the token was known.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[async_trait]
impl TokenVerifier for SessionTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.sessions
            .read()
            .await
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidToken)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AuthError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

async fn authenticate(
    parts: &Parts,
    verifier: &Arc<dyn TokenVerifier>,
) -> Result<Principal, AuthError> {
    let token = bearer_token(parts)?;
    verifier.verify(token).await
}

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, &state.verifier).await?;
        tracing::debug!(user_id = %principal.user_id, "authenticated request");
        Ok(AuthUser(principal))
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Principal);

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, &state.verifier).await?;
        if !principal.is_admin() {
            tracing::warn!(user_id = %principal.user_id, "non-admin caller on admin route");
            return Err(AuthError::Forbidden.into());
        }
        Ok(AdminUser(principal))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn jwt_round_trips_principal() {
        let verifier = JwtVerifier::new("test-secret", Duration::from_secs(60));
        let principal = Principal::new(UserId::new(), Role::Admin);

        let token = verifier.issue(&principal).unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), principal);
    }

    #[tokio::test]
    async fn jwt_signed_with_other_secret_is_invalid() {
        let issuer = JwtVerifier::new("one", Duration::from_secs(60));
        let verifier = JwtVerifier::new("two", Duration::from_secs(60));
        let token = issuer
            .issue(&Principal::new(UserId::new(), Role::Customer))
            .unwrap();

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_jwt_is_rejected() {
        let verifier = JwtVerifier::new("test-secret", Duration::from_secs(60));
        let claims = Claims {
            sub: UserId::new(),
            role: Role::Customer,
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn session_tokens_can_be_revoked() {
        let verifier = SessionTokenVerifier::new();
        let principal = Principal::new(UserId::new(), Role::Customer);
        verifier.insert("opaque", principal).await;

        assert_eq!(verifier.verify("opaque").await.unwrap(), principal);
        assert!(verifier.revoke("opaque").await);
        assert!(verifier.verify("opaque").await.is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(
            bearer_token(&parts_with(Some("Bearer abc"))).unwrap(),
            "abc"
        );
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Basic abc"))),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn admins_can_access_other_users() {
        let me = UserId::new();
        let other = UserId::new();
        assert!(Principal::new(me, Role::Customer).can_access(me));
        assert!(!Principal::new(me, Role::Customer).can_access(other));
        assert!(Principal::new(me, Role::Admin).can_access(other));
    }
}
