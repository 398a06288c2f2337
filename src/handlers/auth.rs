// handlers/auth.rs - account registration and login

use axum::extract::State;
use std::sync::Arc;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::auth_service::{LoginResult, RegisteredUser};
use crate::state::AppState;
use crate::types::{LoginRequest, RegisterRequest};

/// POST /api/auth/register - Create the account and its `users` row
///
/// Tokens are `null` when the identity provider holds the session back until
/// the e-mail is confirmed.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<RegisteredUser> {
    let user = state
        .auth
        .register(&body.email, &body.password, &body.user_name)
        .await?;
    Ok(ApiResponse::created(user))
}

/// POST /api/auth/login - Sign in and return the access token with the stored user name
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<LoginResult> {
    let result = state.auth.login(&body.email, &body.password).await?;
    Ok(ApiResponse::success(result))
}
