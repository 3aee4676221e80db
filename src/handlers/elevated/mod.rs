// handlers/elevated/mod.rs - admin-only endpoints (`protect` + `restrict_to(admin)`)
pub mod users;

pub use users::{create_user, list_users};
