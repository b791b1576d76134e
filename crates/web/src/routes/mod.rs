//! HTTP route handlers for the delivery web app.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//!
//! # Auth
//! GET  /login                  - Login page (?from=<local path>)
//! POST /login                  - Login action (rate limited)
//! GET  /signup                 - Signup page
//! POST /signup                 - Signup action (rate limited)
//! POST /logout                 - Logout action
//!
//! # Guarded (redirect to /login?from=... when signed out)
//! GET  /dashboard              - Dashboard
//! GET  /order                  - Order form
//! POST /order                  - Place order
//! GET  /my-orders              - Order history
//! GET  /orders/{order_id}      - Order detail
//!
//! *                            - Redirect to /
//! ```

pub mod auth;
pub mod dashboard;
pub mod home;
pub mod orders;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Only the credential posts are rate limited; the pages themselves are not.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route(
            "/signup",
            get(auth::signup_page).merge(post(auth::signup).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/order", get(orders::form::show).post(orders::form::submit))
        .route("/my-orders", get(orders::list::index))
        .route("/orders/{order_id}", get(orders::detail::show))
}

/// Create all routes for the app.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/dashboard", get(dashboard::dashboard))
        .merge(auth_routes())
        .merge(order_routes())
        .fallback(unknown_path)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

/// Unknown paths go back to the home page.
async fn unknown_path() -> Redirect {
    Redirect::to("/")
}
