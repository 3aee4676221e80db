// handlers/public/login.rs - POST /api/auth/login

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{
    password::{dummy_hash, verify_password_blocking},
    AuthError,
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Exchange email and password for a bearer token.
///
/// Unknown email, wrong password and deactivated accounts all get the same
/// 401 after the same amount of hashing work, so neither the response nor its
/// timing reveals which accounts exist.
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult<Value> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Please provide email and password"));
    }

    let user = state.users.find_by_email(email).await?.filter(|user| user.is_active);
    let hash = match &user {
        Some(user) => user.password_hash.clone(),
        None => dummy_hash().to_string(),
    };
    let matches = verify_password_blocking(payload.password, hash).await?;

    let user = user.filter(|_| matches).ok_or(AuthError::InvalidCredentials)?;

    let issued = state.keys().issue(&user)?;
    tracing::info!("User {} logged in", user.email);

    Ok(ApiResponse::success(json!({
        "user": user,
        "expires_in": issued.expires_in,
    }))
    .with_message("Logged in successfully")
    .with_token(issued.token))
}
