//! User registration and profile endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use common::{Role, UserId};
use domain::{Registration, RequestContext};
use persistence::{Store, User};
use serde::Serialize;

use crate::auth::{AuthError, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// A user as returned to clients. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// POST /api/v1/users/register: create a customer account.
#[tracing::instrument(skip(state, ctx, body))]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(registration) = body?;
    let user = state.users.register(&ctx, registration).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/v1/users/{id}: a user's own profile, or any profile for admins.
#[tracing::instrument(skip(state, ctx, caller))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(ctx): Extension<RequestContext>,
    AuthUser(caller): AuthUser,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(user_id) = id?;
    if !caller.can_access(user_id) {
        return Err(AuthError::Forbidden.into());
    }
    let user = state.users.get_user(&ctx, user_id).await?;
    Ok(Json(user.into()))
}
