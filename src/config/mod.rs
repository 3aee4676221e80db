use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Default storage target when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/foundation";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Connection parameters, handed to the driver as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_pool_size: u32,
    pub server_selection_timeout_ms: u64,
    pub idle_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

/// Credentials for the bootstrap admin account. Both must be set for the
/// account to be created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        Self::for_environment(environment).with_env_overrides()
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = v;
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_POOL_SIZE") {
            self.database.max_pool_size = v.parse().unwrap_or(self.database.max_pool_size);
        }
        if let Ok(v) = env::var("DATABASE_SERVER_SELECTION_TIMEOUT_MS") {
            self.database.server_selection_timeout_ms =
                v.parse().unwrap_or(self.database.server_selection_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT_MS") {
            self.database.idle_timeout_ms = v.parse().unwrap_or(self.database.idle_timeout_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("FRONTEND_URL") {
            self.security.cors_origins = parse_origins(&v);
        }

        // Admin bootstrap
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.admin.email = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD") {
            self.admin.password = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("ADMIN_NAME") {
            self.admin.name = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_pool_size: 10,
                server_selection_timeout_ms: 5_000,
                idle_timeout_ms: 45_000,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                // Development only; every other environment must set JWT_SECRET
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            admin: AdminConfig::with_default_name(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_pool_size: 10,
                server_selection_timeout_ms: 5_000,
                idle_timeout_ms: 45_000,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.org".to_string()],
            },
            admin: AdminConfig::with_default_name(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_pool_size: 20,
                server_selection_timeout_ms: 5_000,
                idle_timeout_ms: 45_000,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://example.org".to_string()],
            },
            admin: AdminConfig::with_default_name(),
        }
    }
}

impl AdminConfig {
    fn with_default_name() -> Self {
        Self {
            email: None,
            password: None,
            name: "Foundation Admin".to_string(),
        }
    }

    /// Email and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Process-wide snapshot, read once at startup by the binaries
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
