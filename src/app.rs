use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::auth::{AllowedRoles, AuthError, AuthGuard, JwtKeys};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::{ConnectionProvider, PgConnector, UserStore};
use crate::handlers::{elevated, protected, public};
use crate::middleware::{optional_auth, protect, restrict_to};

/// Shared handles injected into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<ConnectionProvider<PgConnector>>,
    pub users: Arc<dyn UserStore>,
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Arc<ConnectionProvider<PgConnector>>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, AuthError> {
        let keys = Arc::new(JwtKeys::from_config(&config.security)?);
        let guard = AuthGuard::new(keys, users.clone());

        Ok(Self {
            config: Arc::new(config),
            db,
            users,
            guard,
        })
    }

    pub fn keys(&self) -> &JwtKeys {
        self.guard.keys()
    }
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(public::health))
        .route("/api/auth/login", post(public::login));

    let optional_routes = Router::new()
        .route("/api/session", get(public::session))
        .route_layer(from_fn_with_state(state.guard.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(protected::whoami))
        .route("/api/auth/password", patch(protected::change_password))
        .route_layer(from_fn_with_state(state.guard.clone(), protect));

    // restrict_to sits inside protect: layers added later run first
    let elevated_routes = Router::new()
        .route("/api/admin/users", get(elevated::list_users).post(elevated::create_user))
        .route_layer(from_fn_with_state(AllowedRoles::admin_only(), restrict_to))
        .route_layer(from_fn_with_state(state.guard.clone(), protect));

    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .merge(elevated_routes)
        .fallback(public::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
