//! Order service error types.

use thiserror::Error;

use crate::backend::{AuthError, StoreError, StoreErrorCode};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No one is signed in.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// No order exists with the requested ID.
    #[error("Order not found")]
    NotFound,

    /// The order belongs to another user.
    #[error("You do not have permission to view this order")]
    PermissionDenied,

    /// The stored document could not be read as an order.
    #[error("malformed order {id}: {reason}")]
    Malformed { id: String, reason: String },

    /// Document store rejected the call.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The caller's session could not supply a token.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

impl OrderError {
    /// Message shown when placing an order fails.
    #[must_use]
    pub fn submit_message(&self) -> String {
        let detail = match self {
            Self::Store(err) => err.message.clone(),
            Self::Auth(err) => err.user_message(),
            other => other.to_string(),
        };
        format!("Failed to create order: {detail}")
    }

    /// Message shown when the order list cannot be loaded.
    #[must_use]
    pub fn list_message(&self) -> String {
        match self {
            Self::Store(err) => match err.code {
                StoreErrorCode::FailedPrecondition => {
                    "Please wait a few minutes and try again. The database is updating.".to_string()
                }
                StoreErrorCode::PermissionDenied => {
                    "You do not have permission to view these orders.".to_string()
                }
                _ => format!("Error: {}", err.message),
            },
            Self::Auth(err) => format!("Error: {}", err.user_message()),
            other => format!("Error: {other}"),
        }
    }

    /// Message shown when a single order cannot be displayed.
    #[must_use]
    pub fn detail_message(&self) -> String {
        match self {
            Self::Store(err) => match err.code {
                StoreErrorCode::NotFound => Self::NotFound.to_string(),
                StoreErrorCode::PermissionDenied => Self::PermissionDenied.to_string(),
                _ => err.message.clone(),
            },
            Self::Auth(err) => err.user_message(),
            Self::Malformed { .. } => "This order could not be displayed.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this is a backend or data fault rather than a user-facing outcome.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Store(err) => !matches!(
                err.code,
                StoreErrorCode::FailedPrecondition
                    | StoreErrorCode::PermissionDenied
                    | StoreErrorCode::NotFound
            ),
            Self::Malformed { .. } => true,
            Self::NotAuthenticated | Self::NotFound | Self::PermissionDenied | Self::Auth(_) => {
                false
            }
        }
    }
}
