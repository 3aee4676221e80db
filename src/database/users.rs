use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::user::{normalize_email, NewUser, User, UserRow};
use crate::database::{ConnectionProvider, DatabaseError, PgConnector};

/// Persistent user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn list(&self) -> Result<Vec<User>, DatabaseError>;

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError>;

    /// Store a new password hash and stamp the rotation time.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<User, DatabaseError>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, \
     password_changed_at, created_at, updated_at";

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        password_changed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

// Plain UNIQUE(email) is case-sensitive; lookups are not
const CREATE_EMAIL_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_key ON users (lower(email))";

/// `UserStore` over the cached Postgres connection. Every call acquires the
/// pool from the provider, so the first query triggers establishment.
#[derive(Clone)]
pub struct PgUserStore {
    db: Arc<ConnectionProvider<PgConnector>>,
}

impl PgUserStore {
    pub fn new(db: Arc<ConnectionProvider<PgConnector>>) -> Self {
        Self { db }
    }

    async fn pool(&self) -> Result<PgPool, DatabaseError> {
        self.db.acquire().await
    }

    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        sqlx::query(CREATE_USERS_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_EMAIL_INDEX).execute(&pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let pool = self.pool().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let pool = self.pool().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, DatabaseError> {
        let pool = self.pool().await?;
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let pool = self.pool().await?;
        let email = normalize_email(&user.email);
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&pool)
        .await;

        match result {
            Ok(row) => User::try_from(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DatabaseError::Conflict(format!(
                "a user with email '{}' already exists",
                email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<User, DatabaseError> {
        let pool = self.pool().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET password_hash = $2, password_changed_at = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_one(&pool)
        .await?;

        User::try_from(row)
    }
}
