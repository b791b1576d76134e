//! Authenticated-session store.
//!
//! A [`SessionStore`] mirrors one browser session's identity from its
//! [`AuthClient`]. It registers a single listener on construction and keeps
//! the latest [`SessionState`] in a watch channel so concurrent requests of
//! the same browser can read it without locking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;

use delivery_core::{Email, Uid};

use crate::backend::{AuthClient, AuthError, Identity, SessionEvent, Subscription};

/// How long login, signup and logout wait for the listener to catch up.
const STATE_SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// The app's current view of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// True until the first notification from the backend arrives.
    pub is_loading: bool,
    /// Last listener failure; cleared by the next notification or explicit call.
    pub last_error: Option<String>,
}

impl SessionState {
    /// State before the backend has reported anything.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            identity: None,
            is_loading: true,
            last_error: None,
        }
    }

    /// Fold a backend notification into the state.
    pub fn apply(&mut self, event: SessionEvent) {
        self.is_loading = false;
        match event {
            SessionEvent::Changed(identity) => {
                self.identity = identity;
                self.last_error = None;
            }
            SessionEvent::Failed(message) => {
                self.last_error = Some(message);
            }
        }
    }
}

/// Per-browser session store.
pub struct SessionStore {
    client: Arc<AuthClient>,
    state: Arc<watch::Sender<SessionState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionStore {
    /// Create a store and register its listener with `client`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(client: Arc<AuthClient>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        let state = Arc::new(state);

        let sink = Arc::clone(&state);
        let subscription = client.on_session_change(move |event| {
            sink.send_modify(|current| current.apply(event));
        });

        Self {
            client,
            state,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The backend client behind this store.
    #[must_use]
    pub fn client(&self) -> &Arc<AuthClient> {
        &self.client
    }

    /// Wait up to `timeout` for the first backend notification.
    ///
    /// Returns the state either way; it is still loading if the wait timed out.
    pub async fn settled(&self, timeout: Duration) -> SessionState {
        let mut rx = self.state.subscribe();
        {
            let _ = tokio::time::timeout(timeout, rx.wait_for(|s| !s.is_loading)).await;
        }
        self.snapshot()
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::UserAlreadyExists` when the backend rejects the account.
    pub async fn signup(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        self.clear_error();
        let email = Email::parse(email)?;
        let identity = self.client.create_identity(&email, password).await?;
        self.wait_for_identity(Some(&identity.uid)).await;
        Ok(identity)
    }

    /// Sign in to an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` or `AuthError::UserNotFound`
    /// when the credentials are rejected.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        self.clear_error();
        let email = Email::parse(email)?;
        let identity = self.client.authenticate(&email, password).await?;
        self.wait_for_identity(Some(&identity.uid)).await;
        Ok(identity)
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend is unavailable.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.clear_error();
        self.client.end_session().await?;
        self.wait_for_identity(None).await;
        Ok(())
    }

    /// Unregister the listener. Later calls do nothing.
    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    async fn wait_for_identity(&self, expected: Option<&Uid>) {
        let mut rx = self.state.subscribe();
        let reached = {
            let waited = tokio::time::timeout(
                STATE_SYNC_TIMEOUT,
                rx.wait_for(|s| !s.is_loading && s.identity.as_ref().map(|i| &i.uid) == expected),
            )
            .await;
            matches!(waited, Ok(Ok(_)))
        };

        if !reached {
            tracing::warn!("session state did not reflect the change in time");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
