use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, header::AUTHORIZATION, HeaderMap, HeaderValue, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::{router, AppState};
use crate::auth::{AuthGuard, JwtKeys};
use crate::config::{AppConfig, Environment};
use crate::database::{normalize_email, Connector, DatabaseError, NewUser, PgConnector, Role, User, UserStore};

pub const TEST_SECRET: &str = "test-secret";

pub fn sample_user(role: Role) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("User {}", id.simple()),
        email: format!("{}@example.org", id.simple()),
        password_hash: String::new(),
        role,
        is_active: true,
        password_changed_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

pub fn guard_with(store: MemoryUserStore) -> (AuthGuard, Arc<MemoryUserStore>) {
    let store = Arc::new(store);
    let keys = JwtKeys::new(TEST_SECRET, chrono::Duration::hours(1)).unwrap();
    (AuthGuard::new(Arc::new(keys), store.clone()), store)
}

/// Router over an in-memory user store. The Postgres provider points at an
/// unreachable address and is never acquired by these routes.
pub fn test_app(store: MemoryUserStore) -> (Router, AppState) {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.jwt_expiry_hours = 1;
    config.database.url = "postgres://foundation@127.0.0.1:1/unreachable".to_string();
    config.database.server_selection_timeout_ms = 200;

    let db = Arc::new(PgConnector::provider(config.database.clone()));
    let state = AppState::new(config, db, Arc::new(store)).unwrap();
    (router(state.clone()), state)
}

pub fn empty_request(method: Method, path: &str, headers: HeaderMap) -> Request<Body> {
    let mut request = Request::builder().method(method).uri(path).body(Body::empty()).unwrap();
    *request.headers_mut() = headers;
    request
}

pub fn json_request(method: Method, path: &str, mut headers: HeaderMap, body: Value) -> Request<Body> {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::from(body.to_string()))
        .unwrap();
    *request.headers_mut() = headers;
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// In-memory `UserStore` with knobs for the states the guard must handle.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    failing: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) -> User {
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().remove(&id);
    }

    pub fn deactivate(&self, id: Uuid) {
        self.modify(id, |u| u.is_active = false);
    }

    pub fn set_role(&self, id: Uuid, role: Role) {
        self.modify(id, |u| u.role = role);
    }

    pub fn set_password_changed_at(&self, id: Uuid, seconds: i64) {
        let at = Utc.timestamp_opt(seconds, 0).unwrap();
        self.modify(id, |u| u.password_changed_at = Some(at));
    }

    /// Make every call fail as if storage were unreachable.
    pub fn fail_lookups(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut User)) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            f(user);
        }
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DatabaseError::EstablishmentFailed(Arc::new(anyhow::anyhow!(
                "connection refused"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.check()?;
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, DatabaseError> {
        self.check()?;
        let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        self.check()?;
        let email = normalize_email(&user.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(DatabaseError::Conflict(format!(
                "a user with email '{}' already exists",
                email
            )));
        }

        let mut created = sample_user(user.role);
        created.name = user.name;
        created.email = email;
        created.password_hash = user.password_hash;
        Ok(self.insert(created))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<User, DatabaseError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::InvalidRecord(format!("user {} not found", id)))?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(changed_at);
        user.updated_at = changed_at;
        Ok(user.clone())
    }
}

/// Connector whose handle is the attempt number. Counts attempts and closes.
pub struct CountingConnector {
    attempts: Arc<AtomicU64>,
    closed: Arc<AtomicUsize>,
    delay: Duration,
    fail_first: u64,
}

impl CountingConnector {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            fail_first: 0,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The first `n` attempts fail.
    pub fn failing_first(mut self, n: u64) -> Self {
        self.fail_first = n;
        self
    }

    pub fn attempts(&self) -> Arc<AtomicU64> {
        self.attempts.clone()
    }

    pub fn closed(&self) -> Arc<AtomicUsize> {
        self.closed.clone()
    }
}

#[async_trait]
impl Connector for CountingConnector {
    type Handle = u64;

    fn target(&self) -> String {
        "counting".to_string()
    }

    async fn connect(&self) -> anyhow::Result<u64> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if attempt <= self.fail_first {
            anyhow::bail!("attempt {} refused", attempt);
        }
        Ok(attempt)
    }

    async fn close(&self, _handle: u64) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
