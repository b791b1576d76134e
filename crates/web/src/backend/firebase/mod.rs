//! Firebase REST client.
//!
//! # APIs
//!
//! ## Identity Toolkit
//! - `accounts:signUp` and `accounts:signInWithPassword` with the web API key
//! - Secure token service for exchanging refresh tokens
//!
//! ## Firestore
//! - `documents:commit` for inserts, with server-side `REQUEST_TIME` transforms
//! - Document GET by name
//! - `documents:runQuery` for filtered, ordered reads
//!
//! Every Firestore call is made with the signed-in user's ID token, so the
//! project's security rules apply to the app exactly as they would to a
//! browser client.

mod auth;
mod firestore;
mod values;

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::FirebaseConfig;

const IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1/token";
const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Identity provider and document store backed by a Firebase project.
#[derive(Clone)]
pub struct FirebaseBackend {
    inner: Arc<FirebaseBackendInner>,
}

struct FirebaseBackendInner {
    client: reqwest::Client,
    api_key: SecretString,
    /// `projects/{id}/databases/(default)/documents`
    documents_root: String,
}

impl FirebaseBackend {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirebaseBackendInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                documents_root: format!(
                    "projects/{}/databases/(default)/documents",
                    config.project_id
                ),
            }),
        }
    }

    fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn api_key(&self) -> &str {
        self.inner.api_key.expose_secret()
    }

    fn documents_root(&self) -> &str {
        &self.inner.documents_root
    }
}

// =============================================================================
// Error bodies
// =============================================================================

/// Error envelope shared by the Google REST APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    /// Canonical status name; Identity Toolkit leaves it out.
    #[serde(default)]
    status: Option<String>,
}

/// Extract the error body from a failed response's text.
///
/// `runQuery` wraps its error in a one-element array; the other endpoints
/// return the envelope directly.
fn parse_error_body(status: StatusCode, text: &str) -> ErrorBody {
    let parsed = serde_json::from_str::<ErrorEnvelope>(text).or_else(|_| {
        serde_json::from_str::<Vec<ErrorEnvelope>>(text)
            .map_err(|_| ())
            .and_then(|list| list.into_iter().next().ok_or(()))
    });

    match parsed {
        Ok(envelope) => envelope.error,
        Err(()) => {
            tracing::warn!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Unparseable Firebase error body"
            );
            ErrorBody {
                message: format!("HTTP {status}"),
                status: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        let err = parse_error_body(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.message, "EMAIL_EXISTS");
        assert!(err.status.is_none());
    }

    #[test]
    fn test_parse_run_query_error_array() {
        let body = r#"[{"error":{"code":400,"message":"The query requires an index.","status":"FAILED_PRECONDITION"}}]"#;
        let err = parse_error_body(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.status.as_deref(), Some("FAILED_PRECONDITION"));
        assert_eq!(err.message, "The query requires an index.");
    }

    #[test]
    fn test_parse_garbage_body() {
        let err = parse_error_body(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(err.message, "HTTP 502 Bad Gateway");
    }
}
