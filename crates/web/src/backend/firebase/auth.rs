//! Identity Toolkit and secure token calls.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use delivery_core::{Email, Uid};

use super::{FirebaseBackend, IDENTITY_TOOLKIT_ENDPOINT, SECURE_TOKEN_ENDPOINT, parse_error_body};
use crate::backend::auth::{AuthError, AuthGrant, Identity, IdentityProvider};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// The secure token service answers in snake case.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

impl FirebaseBackend {
    /// Call one of the `accounts:*` password endpoints.
    async fn password_call(
        &self,
        action: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError> {
        let url = Url::parse_with_params(
            &format!("{IDENTITY_TOOLKIT_ENDPOINT}/accounts:{action}"),
            &[("key", self.api_key())],
        )
        .map_err(|e| AuthError::Backend(e.to_string()))?;

        let request = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };

        let response = self
            .client()
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = parse_error_body(status, &text);
            return Err(auth_error(status, &body.message));
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let email = Email::parse(&body.email)?;
        Ok(AuthGrant {
            identity: Identity {
                uid: Uid::new(body.local_id),
                email,
            },
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
            expires_at: expiry(&body.expires_in),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseBackend {
    async fn create_identity(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn refresh(&self, grant: &AuthGrant) -> Result<AuthGrant, AuthError> {
        let url = Url::parse_with_params(SECURE_TOKEN_ENDPOINT, &[("key", self.api_key())])
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", grant.refresh_token.expose_secret()),
        ];

        let response = self
            .client()
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = parse_error_body(status, &text);
            return Err(auth_error(status, &body.message));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(AuthGrant {
            identity: grant.identity.clone(),
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
            expires_at: expiry(&body.expires_in),
        })
    }

    async fn end_session(&self, _grant: &AuthGrant) -> Result<(), AuthError> {
        // Firebase sign-out is client-side only; the ID token simply ages out.
        Ok(())
    }
}

/// Expiry instant for an `expiresIn` value in seconds.
fn expiry(expires_in: &str) -> chrono::DateTime<Utc> {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

/// Map an Identity Toolkit error message to an [`AuthError`].
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be
/// at least 6 characters`.
fn auth_error(status: StatusCode, message: &str) -> AuthError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message.trim(), None),
    };

    match code {
        "EMAIL_EXISTS" => AuthError::UserAlreadyExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(
            detail
                .unwrap_or("Password should be at least 6 characters")
                .to_string(),
        ),
        "INVALID_EMAIL" => AuthError::Backend("The email address is badly formatted.".to_string()),
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" => AuthError::InvalidCredentials,
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN"
        | "INVALID_GRANT_TYPE" => AuthError::SessionExpired(code.to_string()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::Unavailable(message.to_string()),
        _ if status.is_server_error() => AuthError::Unavailable(message.to_string()),
        _ => AuthError::Backend(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        assert!(matches!(
            auth_error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS"),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            auth_error(StatusCode::BAD_REQUEST, "INVALID_LOGIN_CREDENTIALS"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            auth_error(StatusCode::BAD_REQUEST, "EMAIL_NOT_FOUND"),
            AuthError::UserNotFound
        ));
    }

    #[test]
    fn test_weak_password_keeps_backend_detail() {
        let err = auth_error(
            StatusCode::BAD_REQUEST,
            "WEAK_PASSWORD : Password should be at least 6 characters",
        );
        assert!(
            matches!(err, AuthError::WeakPassword(ref msg) if msg == "Password should be at least 6 characters")
        );
    }

    #[test]
    fn test_refresh_and_server_errors() {
        assert!(matches!(
            auth_error(StatusCode::BAD_REQUEST, "TOKEN_EXPIRED"),
            AuthError::SessionExpired(_)
        ));
        assert!(matches!(
            auth_error(StatusCode::SERVICE_UNAVAILABLE, "backend down"),
            AuthError::Unavailable(_)
        ));
        assert!(matches!(
            auth_error(StatusCode::BAD_REQUEST, "OPERATION_NOT_ALLOWED"),
            AuthError::Backend(_)
        ));
    }

    #[test]
    fn test_expiry_parsing() {
        let before = Utc::now();
        let at = expiry("3600");
        assert!(at >= before + Duration::seconds(3599));
        assert!(expiry("garbage") > before);
    }
}
