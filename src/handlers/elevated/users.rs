// handlers/elevated/users.rs - /api/admin/users (admin only)

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::password::{hash_password_blocking, MIN_PASSWORD_LENGTH};
use crate::database::{normalize_email, NewUser, Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(ApiResponse::success(state.users.list().await?))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let email = normalize_email(&payload.email);
    if payload.name.trim().is_empty() {
        return Err(ApiError::field_error("name", "is required"));
    }
    if !email.contains('@') {
        return Err(ApiError::field_error("email", "must be a valid email address"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::field_error(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    let user = state
        .users
        .create(NewUser {
            name: payload.name.trim().to_string(),
            email,
            password_hash,
            role: payload.role,
        })
        .await?;

    tracing::info!("Created {} account {}", user.role, user.email);
    Ok(ApiResponse::created(user))
}
