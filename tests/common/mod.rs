#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use foundation_api::app::{router, AppState};
use foundation_api::auth::JwtKeys;
use foundation_api::config::{AppConfig, Environment};
use foundation_api::database::{PgConnector, PgUserStore, Role, User};

pub const SECRET: &str = "integration-secret";

/// Full router wired to Postgres on a port nothing listens on, so every
/// storage-backed path fails fast.
pub fn app() -> Result<Router> {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.security.jwt_secret = SECRET.to_string();
    config.database.url = "postgres://foundation@127.0.0.1:1/unreachable".to_string();
    config.database.server_selection_timeout_ms = 250;

    let db = Arc::new(PgConnector::provider(config.database.clone()));
    let users = Arc::new(PgUserStore::new(db.clone()));
    let state = AppState::new(config, db, users)?;
    Ok(router(state))
}

/// A token that verifies against `SECRET` for a user that was never stored.
pub fn token_for_unknown_user() -> Result<String> {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: "Ghost".to_string(),
        email: "ghost@example.org".to_string(),
        password_hash: String::new(),
        role: Role::User,
        is_active: true,
        password_changed_at: None,
        created_at: now,
        updated_at: now,
    };
    let keys = JwtKeys::new(SECRET, chrono::Duration::hours(1))?;
    Ok(keys.issue(&user)?.token)
}

pub async fn call(
    app: &Router,
    method: Method,
    path: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, HeaderValue::from_str(value)?);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}
