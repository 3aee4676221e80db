pub mod connection;
pub mod models;
pub mod users;

use std::sync::Arc;
use thiserror::Error;

pub use connection::{ConnectionProvider, Connector, PgConnector};
pub use models::user::{normalize_email, NewUser, Role, User};
pub use users::{PgUserStore, UserStore};

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection could not be established: {0}")]
    EstablishmentFailed(Arc<anyhow::Error>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
