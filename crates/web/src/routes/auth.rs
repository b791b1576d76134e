//! Authentication route handlers.
//!
//! Handles login, signup and logout against the browser's session store.
//! Credentials go straight to the identity backend; nothing is stored here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;

use crate::backend::{AuthError, Identity};
use crate::error::{auth_status, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CurrentSession, ExistingSession};
use crate::routes::dashboard::DashboardTemplate;
use crate::state::AppState;
use crate::session::safe_return_path;

/// Where a successful login lands when no `from` was given.
const DEFAULT_LANDING: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Page the guard redirected away from.
    #[serde(default)]
    pub from: Option<String>,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters set by the route guard.
#[derive(Debug, Deserialize)]
pub struct FromQuery {
    pub from: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
    /// Local path to return to after login; never an absolute URL.
    pub from: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
    pub email: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<FromQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: None,
        email: String::new(),
        from: safe_return_path(query.from.as_deref()).map(String::from),
    }
}

/// Handle login form submission.
///
/// On success, redirects to the page the guard bounced the user from, or
/// the dashboard.
pub async fn login(session: CurrentSession, Form(form): Form<LoginForm>) -> Response {
    let from = safe_return_path(form.from.as_deref()).map(String::from);
    let password = SecretString::from(form.password);

    match session.store.login(&form.email, &password).await {
        Ok(identity) => {
            signed_in(&identity, "login");
            Redirect::to(from.as_deref().unwrap_or(DEFAULT_LANDING)).into_response()
        }
        Err(e) => {
            log_auth_failure(&e, "login");
            let status = auth_status(&e);
            (
                status,
                LoginTemplate {
                    error: Some(e.user_message()),
                    email: form.email,
                    from,
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
pub async fn signup_page() -> impl IntoResponse {
    SignupTemplate {
        error: None,
        email: String::new(),
    }
}

/// Handle signup form submission.
pub async fn signup(session: CurrentSession, Form(form): Form<SignupForm>) -> Response {
    if form.password != form.password_confirm {
        return (
            StatusCode::BAD_REQUEST,
            SignupTemplate {
                error: Some("Passwords do not match.".to_string()),
                email: form.email,
            },
        )
            .into_response();
    }

    let password = SecretString::from(form.password);
    match session.store.signup(&form.email, &password).await {
        Ok(identity) => {
            signed_in(&identity, "signup");
            Redirect::to(DEFAULT_LANDING).into_response()
        }
        Err(e) => {
            log_auth_failure(&e, "signup");
            (
                auth_status(&e),
                SignupTemplate {
                    error: Some(e.user_message()),
                    email: form.email,
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// A browser without a session store is already signed out. A failed logout
/// keeps the user on the dashboard with the error shown.
pub async fn logout(
    State(state): State<AppState>,
    ExistingSession(session): ExistingSession,
) -> Response {
    let Some(session) = session else {
        return Redirect::to("/login").into_response();
    };

    let email = session
        .store
        .snapshot()
        .identity
        .map(|identity| identity.email.to_string())
        .unwrap_or_default();

    match session.store.logout().await {
        Ok(()) => {
            state.sessions().remove(session.key).await;
            clear_sentry_user();
            tracing::info!(session = %session.key, "user logged out");
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, session = %session.key, "logout failed");
            (
                auth_status(&e),
                DashboardTemplate {
                    email,
                    error: Some(e.user_message()),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn signed_in(identity: &Identity, action: &str) {
    set_sentry_user(&identity.uid, Some(identity.email.as_str()));
    tracing::info!(uid = %identity.uid, action, "user signed in");
}

fn log_auth_failure(err: &AuthError, action: &str) {
    if auth_status(err).is_server_error() {
        tracing::error!(error = %err, action, "authentication backend failed");
    } else {
        tracing::warn!(error = %err, action, "authentication rejected");
    }
}
