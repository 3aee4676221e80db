pub mod bootstrap;

pub use bootstrap::{ensure_admin, ensure_admin_logged, BootstrapOutcome};
