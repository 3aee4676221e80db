use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::auth::{AllowedRoles, AuthError, AuthGuard, Principal, RequestContext};
use crate::error::ApiError;

/// Mandatory authentication. Rejects with 401 unless the bearer token resolves
/// to a current, active user.
pub async fn protect(
    State(guard): State<AuthGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = guard.resolve(request.headers()).await.map_err(|e| {
        tracing::debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        ApiError::from(e)
    })?;

    request
        .extensions_mut()
        .insert(RequestContext::authenticated(principal));

    Ok(next.run(request).await)
}

/// Optional authentication. Never rejects; on any failure the request
/// continues as anonymous.
pub async fn optional_auth(State(guard): State<AuthGuard>, mut request: Request, next: Next) -> Response {
    let context = match guard.resolve(request.headers()).await {
        Ok(principal) => RequestContext::authenticated(principal),
        Err(AuthError::Database(e)) => {
            tracing::warn!("Continuing anonymously, user lookup failed: {}", e);
            RequestContext::anonymous()
        }
        Err(e) => {
            tracing::debug!("Continuing anonymously: {}", e);
            RequestContext::anonymous()
        }
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Role restriction. Must be layered inside `protect`.
pub async fn restrict_to(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<RequestContext>()
        .and_then(RequestContext::principal);

    allowed.check(principal)?;

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestContext>().cloned().unwrap_or_default())
    }
}

/// Extractor for handlers behind `protect`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.principal.clone())
            .map(CurrentUser)
            .ok_or_else(|| AuthError::Unauthenticated.into())
    }
}
