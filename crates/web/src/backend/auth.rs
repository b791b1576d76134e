//! Authentication backend contract.
//!
//! The identity provider owns accounts and credentials. The app only sees
//! the [`Identity`] it vouches for and the tokens needed to act on that
//! identity's behalf against the document store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

use delivery_core::{Email, EmailError, Uid};

/// How long before expiry a token is treated as already expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// The authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Backend-assigned unique user ID.
    pub uid: Uid,
    /// Email address the account was created with.
    pub email: Email,
}

/// Backend tokens backing an [`Identity`].
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub identity: Identity,
    /// Short-lived bearer token for document store calls.
    pub id_token: SecretString,
    /// Long-lived token used to mint a new `id_token`.
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AuthGrant {
    /// Whether the ID token must be refreshed before use.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECONDS) >= self.expires_at
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account exists for the email.
    #[error("user not found")]
    UserNotFound,

    /// An account already exists for the email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password rejected by the backend's strength policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// An operation needed a signed-in user and there was none.
    #[error("no user signed in")]
    NotSignedIn,

    /// The backend refused to renew the session (revoked, disabled, expired).
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The backend could not be reached or answered with a server error.
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),

    /// Any other backend rejection, message kept verbatim.
    #[error("authentication error: {0}")]
    Backend(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message suitable for showing on the login and signup forms.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::InvalidCredentials | Self::UserNotFound => {
                "Invalid email or password.".to_string()
            }
            Self::UserAlreadyExists => "An account with this email already exists.".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::NotSignedIn | Self::SessionExpired(_) => {
                "Your session has expired, please log in again.".to_string()
            }
            Self::Unavailable(_) => {
                "The authentication service is unavailable, please try again.".to_string()
            }
            Self::Backend(msg) => msg.clone(),
            Self::PasswordHash => "Authentication error".to_string(),
        }
    }
}

/// Account operations offered by the authentication backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new account and sign it in.
    async fn create_identity(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError>;

    /// Sign in to an existing account.
    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError>;

    /// Exchange the refresh token for a fresh ID token.
    async fn refresh(&self, grant: &AuthGrant) -> Result<AuthGrant, AuthError>;

    /// End the backend session behind `grant`.
    async fn end_session(&self, grant: &AuthGrant) -> Result<(), AuthError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grant_expiring_at(expires_at: DateTime<Utc>) -> AuthGrant {
        AuthGrant {
            identity: Identity {
                uid: Uid::new("u1"),
                email: Email::parse("u1@example.com").unwrap(),
            },
            id_token: SecretString::from("id"),
            refresh_token: SecretString::from("refresh"),
            expires_at,
        }
    }

    #[test]
    fn test_grant_expiry_includes_skew() {
        let now = Utc::now();
        assert!(!grant_expiring_at(now + Duration::hours(1)).is_expired(now));
        assert!(grant_expiring_at(now + Duration::seconds(30)).is_expired(now));
        assert!(grant_expiring_at(now - Duration::seconds(1)).is_expired(now));
    }

    #[test]
    fn test_user_messages_hide_lookup_details() {
        assert_eq!(
            AuthError::UserNotFound.user_message(),
            AuthError::InvalidCredentials.user_message()
        );
        assert_eq!(
            AuthError::WeakPassword("Password should be at least 6 characters".into())
                .user_message(),
            "Password should be at least 6 characters"
        );
    }
}
