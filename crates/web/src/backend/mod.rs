//! Authentication and document backend.
//!
//! The app never owns user accounts or order storage. Both live behind the
//! [`IdentityProvider`] and [`DocumentStore`] traits, implemented by the
//! hosted Firebase services in production and by [`MemoryBackend`] for
//! local development and tests.

pub mod auth;
pub mod client;
pub mod document;
pub mod firebase;
pub mod memory;

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;

pub use auth::{AuthError, AuthGrant, Identity, IdentityProvider};
pub use client::{AuthClient, SessionEvent, Subscription};
pub use document::{
    Direction, Document, DocumentStore, FieldValue, Query, Record, StoreError, StoreErrorCode,
};
pub use firebase::FirebaseBackend;
pub use memory::MemoryBackend;

use crate::config::BackendConfig;

/// The pair of backend services the app talks to.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Backend {
    /// Build the backend selected by configuration.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        match config {
            BackendConfig::Firebase(firebase) => {
                let backend = Arc::new(FirebaseBackend::new(firebase));
                Self {
                    identity: backend.clone(),
                    documents: backend,
                }
            }
            BackendConfig::Memory => Self::in_memory(Arc::new(MemoryBackend::new())),
        }
    }

    /// Use an existing in-memory backend for both services.
    #[must_use]
    pub fn in_memory(backend: Arc<MemoryBackend>) -> Self {
        Self {
            identity: backend.clone(),
            documents: backend,
        }
    }
}

/// Random alphanumeric ID of `len` characters.
pub(crate) fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
