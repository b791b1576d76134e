//! Error types and status mapping with Sentry integration.
//!
//! Auth and order failures are rendered by their own pages, so they only go
//! through [`auth_status`] and [`order_status`]. [`AppError`] covers the
//! failures no page can explain and is captured to Sentry before it
//! responds.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::{AuthError, StoreErrorCode};
use crate::services::OrderError;

/// Request-level failure outside any page's own error handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Browser session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        // Don't expose internal error details to clients
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// HTTP status for a failed authentication call.
#[must_use]
pub const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials
        | AuthError::UserNotFound
        | AuthError::NotSignedIn
        | AuthError::SessionExpired(_) => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
        AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Backend(_) | AuthError::PasswordHash => StatusCode::BAD_GATEWAY,
    }
}

/// HTTP status for a failed order operation.
///
/// Never 500: order failures render their own page rather than the
/// recovery page.
#[must_use]
pub const fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::PermissionDenied => StatusCode::FORBIDDEN,
        OrderError::Store(store) => match store.code {
            StoreErrorCode::NotFound => StatusCode::NOT_FOUND,
            StoreErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            StoreErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            StoreErrorCode::FailedPrecondition | StoreErrorCode::Unavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::BAD_GATEWAY,
        },
        OrderError::Auth(auth) => auth_status(auth),
        OrderError::Malformed { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Report an order failure that is a backend or data fault.
pub fn report_order_error(err: &OrderError) {
    if err.is_internal() {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "order operation failed");
    } else {
        tracing::info!(error = %err, "order operation refused");
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order placed", Some(&[("order_id", "AbC123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::backend::StoreError;

    use super::*;

    #[tokio::test]
    async fn test_app_error_hides_details() {
        let err = AppError::Internal("session layer missing".to_string());
        assert_eq!(err.to_string(), "Internal error: session layer missing");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Internal server error");
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(
            auth_status(&AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_status(&AuthError::UserAlreadyExists),
            StatusCode::CONFLICT
        );
        assert_eq!(
            auth_status(&AuthError::WeakPassword("too short".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            auth_status(&AuthError::Unavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_order_status_codes() {
        assert_eq!(
            order_status(&OrderError::PermissionDenied),
            StatusCode::FORBIDDEN
        );
        assert_eq!(order_status(&OrderError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            order_status(&OrderError::NotAuthenticated),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_order_failures_never_map_to_500() {
        for code in [
            StoreErrorCode::FailedPrecondition,
            StoreErrorCode::PermissionDenied,
            StoreErrorCode::NotFound,
            StoreErrorCode::Unauthenticated,
            StoreErrorCode::InvalidArgument,
            StoreErrorCode::Unavailable,
            StoreErrorCode::Unknown,
        ] {
            let err = OrderError::Store(StoreError::new(code, "boom"));
            assert_ne!(order_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(
            order_status(&OrderError::Store(StoreError::new(
                StoreErrorCode::FailedPrecondition,
                "index"
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
