// handlers/protected/mod.rs - endpoints behind `protect`
pub mod password;
pub mod whoami;

pub use password::change_password;
pub use whoami::whoami;
