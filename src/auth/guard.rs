use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{AuthError, JwtKeys};
use crate::database::{Role, User, UserStore};

/// Authenticated identity for the current request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            password_changed_at: user.password_changed_at,
        }
    }
}

/// Per-request context populated by the auth middleware before handlers run.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

/// Roles permitted on a route, fixed when the route is registered.
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<[Role]>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    pub fn check(&self, principal: Option<&Principal>) -> Result<(), AuthError> {
        match principal {
            Some(p) if self.0.contains(&p.role) => Ok(()),
            _ => Err(AuthError::Forbidden),
        }
    }
}

/// Resolves bearer tokens to principals. Shared by the mandatory and
/// optional middleware so both apply exactly the same checks.
#[derive(Clone)]
pub struct AuthGuard {
    keys: Arc<JwtKeys>,
    users: Arc<dyn UserStore>,
}

impl AuthGuard {
    pub fn new(keys: Arc<JwtKeys>, users: Arc<dyn UserStore>) -> Self {
        Self { keys, users }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// header → signature/expiry → user still exists and is active →
    /// password not rotated since the token was issued.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.keys.verify(token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::PrincipalGone)?;

        if user.changed_password_after(claims.iat) {
            return Err(AuthError::StaleCredentials);
        }

        Ok(Principal::from(user))
    }
}

/// Token from `Authorization: Bearer <token>`. Any other shape counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::Unauthenticated)?;

    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, guard_with, sample_user, MemoryUserStore};
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::Unauthenticated)));
        assert!(matches!(bearer_token(&headers("Basic abc123")), Err(AuthError::Unauthenticated)));
        assert!(matches!(bearer_token(&headers("Bearer ")), Err(AuthError::Unauthenticated)));
        assert!(matches!(bearer_token(&headers("Bearerabc")), Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let (guard, _) = guard_with(MemoryUserStore::new());
        let err = guard.resolve(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn basic_scheme_is_unauthenticated() {
        let (guard, _) = guard_with(MemoryUserStore::new());
        let err = guard.resolve(&headers("Basic abc123")).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn token_signed_elsewhere_is_invalid() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::Admin));
        let (guard, _) = guard_with(store);

        let foreign = JwtKeys::new("some-other-secret", chrono::Duration::hours(1))
            .unwrap()
            .issue(&user)
            .unwrap();
        let err = guard.resolve(&bearer(&foreign.token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn deleted_user_is_gone() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::Admin));
        let (guard, store) = guard_with(store);
        let token = guard.keys().issue(&user).unwrap().token;

        store.remove(user.id);
        let err = guard.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::PrincipalGone));
    }

    #[tokio::test]
    async fn inactive_user_is_gone() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::User));
        let (guard, store) = guard_with(store);
        let token = guard.keys().issue(&user).unwrap().token;

        store.deactivate(user.id);
        let err = guard.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::PrincipalGone));
    }

    #[tokio::test]
    async fn rotated_credentials_invalidate_older_tokens() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::User));
        let (guard, store) = guard_with(store);

        let t = Utc::now().timestamp() - 60;
        store.set_password_changed_at(user.id, t + 1);

        let before = guard.keys().issue_at(&user, t).unwrap().token;
        let err = guard.resolve(&bearer(&before)).await.unwrap_err();
        assert!(matches!(err, AuthError::StaleCredentials));

        let after = guard.keys().issue_at(&user, t + 2).unwrap().token;
        let principal = guard.resolve(&bearer(&after)).await.unwrap();
        assert_eq!(principal.id, user.id);
    }

    #[tokio::test]
    async fn principal_reflects_current_record() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::User));
        let (guard, store) = guard_with(store);
        let token = guard.keys().issue(&user).unwrap().token;

        // Role in the token is stale; the stored record wins
        store.set_role(user.id, Role::Admin);
        let principal = guard.resolve(&bearer(&token)).await.unwrap();
        assert_eq!(principal.role, Role::Admin);
    }

    #[tokio::test]
    async fn storage_failure_is_not_an_auth_failure() {
        let store = MemoryUserStore::new();
        let user = store.insert(sample_user(Role::User));
        let (guard, store) = guard_with(store);
        let token = guard.keys().issue(&user).unwrap().token;

        store.fail_lookups(true);
        let err = guard.resolve(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Database(_)));
    }

    #[test]
    fn allowed_roles_check() {
        let admin_only = AllowedRoles::admin_only();
        let user = Principal::from(sample_user(Role::User));
        let admin = Principal::from(sample_user(Role::Admin));

        assert!(matches!(admin_only.check(Some(&user)), Err(AuthError::Forbidden)));
        assert!(matches!(admin_only.check(None), Err(AuthError::Forbidden)));
        assert!(admin_only.check(Some(&admin)).is_ok());
        assert!(AllowedRoles::new([Role::Admin, Role::User]).check(Some(&user)).is_ok());
    }
}
