// handlers/protected/password.rs - PATCH /api/auth/password

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{
    password::{hash_password_blocking, verify_password_blocking, MIN_PASSWORD_LENGTH},
    AuthError, Principal,
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Rotate the caller's password. Stamps `password_changed_at`, which makes
/// every token issued before now stale, and returns a fresh token.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Principal> {
    if payload.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::field_error(
            "new_password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    let user = state
        .users
        .find_by_id(principal.id)
        .await?
        .ok_or(AuthError::PrincipalGone)?;

    if !verify_password_blocking(payload.current_password, user.password_hash.clone()).await? {
        return Err(ApiError::unauthorized("Your current password is wrong."));
    }

    let hash = hash_password_blocking(payload.new_password).await?;
    let updated = state.users.update_password(user.id, &hash, Utc::now()).await?;
    let issued = state.keys().issue(&updated)?;

    tracing::info!("User {} changed password", updated.email);

    Ok(ApiResponse::success(Principal::from(updated))
        .with_message("Password updated")
        .with_token(issued.token))
}
