//! Session and route guard extractors.
//!
//! [`CurrentSession`] resolves the browser's [`SessionStore`] from the
//! session cookie, starting one if needed; only the sign-in posts use it.
//! [`ExistingSession`] never starts one, so anonymous traffic leaves no
//! cookie record and no store behind. [`RequireIdentity`] runs the route
//! guard over the store's state and either hands the handler the signed-in
//! identity or answers the request itself.

use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::backend::Identity;
use crate::error::AppError;
use crate::filters;
use crate::middleware::session::keys;
use crate::services::Caller;
use crate::session::{GuardDecision, SessionStore, decide, login_redirect};
use crate::state::AppState;

/// How long a request waits for a new store's first notification before
/// showing the waiting page instead.
const SETTLE_TIMEOUT: Duration = Duration::from_millis(250);

/// The browser's session store.
///
/// A client key is minted and saved in the cookie session if the browser
/// has none yet.
pub struct CurrentSession {
    pub key: Uuid,
    pub store: Arc<SessionStore>,
}

impl CurrentSession {
    /// The signed-in caller, if any, once the store has settled.
    pub async fn caller(&self) -> Option<Caller> {
        let state = self.store.settled(SETTLE_TIMEOUT).await;
        state.identity.map(|identity| Caller {
            identity,
            client: Arc::clone(self.store.client()),
        })
    }
}

fn cookie_session(parts: &Parts) -> Result<Session, AppError> {
    // Set by SessionManagerLayer
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = cookie_session(parts)?;

        let key = if let Some(key) = session.get::<Uuid>(keys::CLIENT_KEY).await? {
            key
        } else {
            let key = Uuid::new_v4();
            session.insert(keys::CLIENT_KEY, key).await?;
            key
        };

        let store = state.sessions().store_for(key).await;
        Ok(Self { key, store })
    }
}

/// The browser's session store if it already has one.
///
/// # Example
///
/// ```rust,ignore
/// async fn home(ExistingSession(session): ExistingSession) -> impl IntoResponse {
///     match session {
///         Some(s) => format!("session {}", s.key),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct ExistingSession(pub Option<CurrentSession>);

impl ExistingSession {
    /// The signed-in caller, if any.
    pub async fn caller(&self) -> Option<Caller> {
        match &self.0 {
            Some(session) => session.caller().await,
            None => None,
        }
    }
}

impl FromRequestParts<AppState> for ExistingSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = cookie_session(parts)?;
        let Some(key) = session.get::<Uuid>(keys::CLIENT_KEY).await? else {
            return Ok(Self(None));
        };

        let store = state.sessions().existing(key).await;
        Ok(Self(store.map(|store| CurrentSession { key, store })))
    }
}

/// Extractor for guarded pages.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(guard: RequireIdentity) -> impl IntoResponse {
///     format!("Signed in as {}", guard.identity.email)
/// }
/// ```
pub struct RequireIdentity {
    pub identity: Identity,
    pub session: CurrentSession,
}

impl RequireIdentity {
    /// The identity as an order service caller.
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller {
            identity: self.identity.clone(),
            client: Arc::clone(self.session.store.client()),
        }
    }
}

/// Response for a guarded request that cannot render yet.
pub enum GuardRejection {
    /// Session state is still loading.
    Wait,
    /// No one is signed in.
    Redirect(String),
    /// The session could not be resolved.
    Failed(AppError),
}

/// Neutral page shown while the session settles; it reloads itself.
#[derive(Template, WebTemplate)]
#[template(path = "waiting.html")]
pub struct WaitingTemplate {
    /// Seconds before the page reloads.
    pub refresh_secs: u8,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Wait => WaitingTemplate { refresh_secs: 1 }.into_response(),
            Self::Redirect(to) => Redirect::to(&to).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let requested = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        let ExistingSession(session) = ExistingSession::from_request_parts(parts, state)
            .await
            .map_err(GuardRejection::Failed)?;
        let Some(session) = session else {
            tracing::debug!(path = %requested, "guarded page requested without a session");
            return Err(GuardRejection::Redirect(login_redirect(&requested)));
        };

        let snapshot = session.store.settled(SETTLE_TIMEOUT).await;
        match decide(&snapshot, &requested) {
            GuardDecision::Render(identity) => Ok(Self { identity, session }),
            GuardDecision::Redirect(to) => {
                tracing::debug!(path = %requested, "guarded page requested while signed out");
                Err(GuardRejection::Redirect(to))
            }
            GuardDecision::Wait => Err(GuardRejection::Wait),
        }
    }
}
