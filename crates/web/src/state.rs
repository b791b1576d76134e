//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::config::WebConfig;
use crate::middleware::session::SESSION_EXPIRY_SECONDS;
use crate::services::OrderService;
use crate::session::SessionHub;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// session registry, the order service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    sessions: SessionHub,
    orders: OrderService,
}

impl AppState {
    /// Create a new application state over `backend`.
    ///
    /// Session stores idle out together with the cookie session that
    /// points at them.
    #[must_use]
    pub fn new(config: WebConfig, backend: Backend) -> Self {
        let idle = Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs());
        let sessions = SessionHub::new(backend.identity, idle);
        let orders = OrderService::new(backend.documents);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                orders,
            }),
        }
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the per-browser session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionHub {
        &self.inner.sessions
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
