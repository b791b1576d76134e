//! Registry of live session stores.
//!
//! Each browser session gets one [`SessionStore`], created when it first
//! tries to sign in and keyed by a random ID kept in the session cookie. Stores idle longer
//! than the configured time are evicted and shut down.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::notification::RemovalCause;
use uuid::Uuid;

use crate::backend::{AuthClient, IdentityProvider};

use super::store::SessionStore;

/// Upper bound on concurrently tracked browser sessions.
pub const MAX_SESSIONS: u64 = 10_000;

/// Process-wide map of browser sessions to their stores.
#[derive(Clone)]
pub struct SessionHub {
    identity: Arc<dyn IdentityProvider>,
    stores: Cache<Uuid, Arc<SessionStore>>,
}

impl SessionHub {
    /// Create an empty hub whose stores expire after `idle` without use.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, idle: Duration) -> Self {
        let stores = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle)
            .eviction_listener(|key: Arc<Uuid>, store: Arc<SessionStore>, cause| {
                if cause != RemovalCause::Replaced {
                    tracing::debug!(session = %key, ?cause, "session store evicted");
                }
                store.shutdown();
            })
            .build();

        Self { identity, stores }
    }

    /// The store for `key`, created signed out if it doesn't exist yet.
    pub async fn store_for(&self, key: Uuid) -> Arc<SessionStore> {
        let identity = Arc::clone(&self.identity);
        self.stores
            .get_with(key, async move {
                tracing::debug!(session = %key, "session store created");
                Arc::new(SessionStore::new(Arc::new(AuthClient::new(identity))))
            })
            .await
    }

    /// The store for `key` if one is live.
    pub async fn existing(&self, key: Uuid) -> Option<Arc<SessionStore>> {
        self.stores.get(&key).await
    }

    /// Drop the store for `key`, shutting it down.
    pub async fn remove(&self, key: Uuid) {
        self.stores.invalidate(&key).await;
    }

    /// Apply pending evictions now.
    #[cfg(test)]
    async fn run_pending_tasks(&self) {
        self.stores.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::backend::MemoryBackend;

    fn hub() -> SessionHub {
        SessionHub::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_same_key_same_store() {
        let hub = hub();
        let key = Uuid::new_v4();
        let first = hub.store_for(key).await;
        let second = hub.store_for(key).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = hub.store_for(Uuid::new_v4()).await;
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let hub = hub();
        let alice = hub.store_for(Uuid::new_v4()).await;
        let bob = hub.store_for(Uuid::new_v4()).await;

        alice
            .signup("alice@example.com", &SecretString::from("secret1"))
            .await
            .unwrap();
        assert!(alice.snapshot().identity.is_some());
        assert!(
            bob.settled(Duration::from_secs(1))
                .await
                .identity
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_remove_shuts_store_down() {
        let hub = hub();
        let key = Uuid::new_v4();
        let store = hub.store_for(key).await;
        assert_eq!(store.client().listener_count(), 1);

        hub.remove(key).await;
        hub.run_pending_tasks().await;
        assert_eq!(store.client().listener_count(), 0);
        assert!(hub.existing(key).await.is_none());
    }

    #[tokio::test]
    async fn test_existing_never_creates() {
        let hub = hub();
        let key = Uuid::new_v4();
        assert!(hub.existing(key).await.is_none());
        assert!(hub.existing(key).await.is_none());

        let store = hub.store_for(key).await;
        assert!(Arc::ptr_eq(&hub.existing(key).await.unwrap(), &store));
    }
}
