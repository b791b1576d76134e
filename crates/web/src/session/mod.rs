//! Browser session state: per-session stores, their registry, and the
//! route guard that reads them.

pub mod guard;
pub mod hub;
pub mod store;

pub use guard::{GuardDecision, decide, login_redirect, safe_return_path};
pub use hub::{MAX_SESSIONS, SessionHub};
pub use store::{SessionState, SessionStore};
