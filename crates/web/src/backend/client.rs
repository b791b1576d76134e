//! Per-browser authentication client with a live-session notifier.
//!
//! One [`AuthClient`] exists for every browser session. It holds that
//! browser's [`AuthGrant`] and publishes every change to the signed-in
//! identity. Listeners registered with [`AuthClient::on_session_change`]
//! receive the current value immediately and every later change; they are
//! torn down through the returned [`Subscription`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;

use delivery_core::Email;

use super::auth::{AuthError, AuthGrant, Identity, IdentityProvider};

/// A change reported by the live-session notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The signed-in identity is now this value.
    Changed(Option<Identity>),
    /// The session could not be maintained; the identity is unchanged.
    Failed(String),
}

/// Authentication client for a single browser session.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    grant: Mutex<Option<AuthGrant>>,
    events: watch::Sender<SessionEvent>,
    listeners: Arc<AtomicUsize>,
}

impl AuthClient {
    /// Create a signed-out client.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (events, _) = watch::channel(SessionEvent::Changed(None));
        Self {
            provider,
            grant: Mutex::new(None),
            events,
            listeners: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an account and sign this client in as it.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (duplicate account, weak password,
    /// invalid email) or `AuthError::Unavailable`.
    pub async fn create_identity(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let grant = self.provider.create_identity(email, password).await?;
        Ok(self.install(grant).await)
    }

    /// Sign this client in to an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` or `AuthError::UserNotFound`
    /// when the backend rejects the credentials.
    pub async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let grant = self.provider.authenticate(email, password).await?;
        Ok(self.install(grant).await)
    }

    /// Sign this client out.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend could not end the session; the
    /// client stays signed in in that case.
    pub async fn end_session(&self) -> Result<(), AuthError> {
        let mut slot = self.grant.lock().await;
        if let Some(grant) = slot.as_ref() {
            self.provider.end_session(grant).await?;
        }
        *slot = None;
        self.events.send_replace(SessionEvent::Changed(None));
        Ok(())
    }

    /// A usable ID token for the signed-in user, refreshed if it expired.
    ///
    /// A failed refresh is published to listeners as [`SessionEvent::Failed`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` when signed out, or the refresh error.
    pub async fn access_token(&self) -> Result<SecretString, AuthError> {
        let mut slot = self.grant.lock().await;
        let grant = slot.as_ref().ok_or(AuthError::NotSignedIn)?;
        if !grant.is_expired(Utc::now()) {
            return Ok(grant.id_token.clone());
        }

        match self.provider.refresh(grant).await {
            Ok(fresh) => {
                tracing::debug!(uid = %fresh.identity.uid, "ID token refreshed");
                let token = fresh.id_token.clone();
                *slot = Some(fresh);
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ID token refresh failed");
                self.events.send_replace(SessionEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Register a listener for session changes.
    ///
    /// The listener runs on its own task: first with the current value, then
    /// once per change. Rapid successive changes may be coalesced, but the
    /// last value is always delivered.
    pub fn on_session_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(SessionEvent) + Send + 'static,
    {
        let mut events = self.events.subscribe();
        let task = tokio::spawn(async move {
            loop {
                let event = events.borrow_and_update().clone();
                listener(event);
                if events.changed().await.is_err() {
                    break;
                }
            }
        });

        self.listeners.fetch_add(1, Ordering::SeqCst);
        Subscription {
            task: Some(task.abort_handle()),
            listeners: Arc::clone(&self.listeners),
        }
    }

    /// Number of listeners currently registered.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }

    async fn install(&self, grant: AuthGrant) -> Identity {
        let identity = grant.identity.clone();
        *self.grant.lock().await = Some(grant);
        self.events
            .send_replace(SessionEvent::Changed(Some(identity.clone())));
        identity
    }
}

/// Handle to a registered session listener.
///
/// The listener is unregistered exactly once: by [`Subscription::unsubscribe`]
/// or, failing that, when the handle is dropped.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    task: Option<AbortHandle>,
    listeners: Arc<AtomicUsize>,
}

impl Subscription {
    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.listeners.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!("session listener unregistered");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
