//! HTTP middleware stack for the delivery web app.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Panic catcher (handler panic → recovery page)
//! 3. `TraceLayer` (request span)
//! 4. Request ID (fills the span's `request_id`)
//! 5. Security headers (CSP, frame denial, etc.)
//! 6. Error boundary (500 → recovery page)
//! 7. Session layer (tower-sessions cookie → client key)
//! 8. Rate limiting on credential posts (governor)
//!
//! The guard extractors in [`auth`] run inside handlers, after all layers.

pub mod auth;
pub mod error_boundary;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{CurrentSession, ExistingSession, GuardRejection, RequireIdentity};
pub use error_boundary::{catch_panic_layer, error_boundary_middleware};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SessionRecords, create_session_layer};
