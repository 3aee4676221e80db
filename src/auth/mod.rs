pub mod guard;
pub mod password;
pub mod token;

use thiserror::Error;

use crate::database::DatabaseError;

pub use guard::{AllowedRoles, AuthGuard, Principal, RequestContext};
pub use token::{Claims, IssuedToken, JwtKeys};

/// Why a request could not be authenticated or authorized.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("You are not logged in. Please log in to get access.")]
    Unauthenticated,

    #[error("Invalid token. Please log in again.")]
    InvalidToken,

    #[error("The user belonging to this token no longer exists.")]
    PrincipalGone,

    #[error("User recently changed password. Please log in again.")]
    StaleCredentials,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT_EXPIRY_HOURS must be between 1 and {max}, got {0}", max = token::MAX_TOKEN_HOURS)]
    InvalidTokenLifetime(u64),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
