// handlers/public/mod.rs - endpoints reachable without a token
pub mod fallback;
pub mod health;
pub mod login;
pub mod session;

pub use fallback::not_found;
pub use health::health;
pub use login::login;
pub use session::session;
