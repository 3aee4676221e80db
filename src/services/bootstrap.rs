use tracing::{info, warn};

use crate::auth::{password::hash_password_blocking, AuthError};
use crate::config::AdminConfig;
use crate::database::{NewUser, Role, User, UserStore};

#[derive(Debug)]
pub enum BootstrapOutcome {
    Created(User),
    AlreadyExists(User),
    NotConfigured,
}

/// Make sure the configured admin account exists.
pub async fn ensure_admin(users: &dyn UserStore, admin: &AdminConfig) -> Result<BootstrapOutcome, AuthError> {
    let Some((email, password)) = admin.credentials() else {
        return Ok(BootstrapOutcome::NotConfigured);
    };

    if let Some(existing) = users.find_by_email(email).await? {
        return Ok(BootstrapOutcome::AlreadyExists(existing));
    }

    let password_hash = hash_password_blocking(password.to_string()).await?;
    let created = users
        .create(NewUser {
            name: admin.name.clone(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await?;

    Ok(BootstrapOutcome::Created(created))
}

/// Startup variant: logs the outcome and never fails the process.
pub async fn ensure_admin_logged(users: &dyn UserStore, admin: &AdminConfig) {
    match ensure_admin(users, admin).await {
        Ok(BootstrapOutcome::Created(user)) => info!("Admin user {} created", user.email),
        Ok(BootstrapOutcome::AlreadyExists(user)) => info!("Admin user {} already exists", user.email),
        Ok(BootstrapOutcome::NotConfigured) => {
            warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin bootstrap")
        }
        Err(e) => warn!("Failed to create admin user: {}", e),
    }
}
