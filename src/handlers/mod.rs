// handlers/mod.rs - handlers grouped by the guard in front of them
//
// public:    no authentication (health, login); the session probe runs behind optional_auth
// protected: protect (valid bearer token for a current, active user)
// elevated:  protect + restrict_to(admin)
pub mod elevated;
pub mod protected;
pub mod public;
