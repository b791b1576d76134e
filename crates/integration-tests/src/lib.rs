//! Integration tests for the delivery web app.
//!
//! Each test spawns the full router on an ephemeral port, backed by a fresh
//! in-memory backend, and drives it over HTTP like a browser would: cookies
//! are kept, redirects are not followed so tests can assert on them.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p delivery-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, redirect};

use delivery_core::Region;
use delivery_web::backend::{Backend, MemoryBackend};
use delivery_web::config::{BackendConfig, WebConfig};
use delivery_web::state::AppState;

/// Password used by test accounts.
pub const PASSWORD: &str = "secret123";

/// A running app plus direct access to its backend.
pub struct TestApp {
    pub base_url: String,
    pub backend: Arc<MemoryBackend>,
}

impl TestApp {
    /// Start the app on 127.0.0.1 with an ephemeral port.
    pub async fn spawn() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let config = WebConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            backend: BackendConfig::Memory,
            default_region: Region::Douala,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config, Backend::in_memory(Arc::clone(&backend)));
        let app = delivery_web::app(state);

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            backend,
        }
    }

    /// A new browser: its own cookie jar, redirects not followed.
    #[must_use]
    pub fn browser(&self) -> Browser {
        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");
        Browser {
            client,
            base_url: self.base_url.clone(),
        }
    }
}

/// One browser session against a [`TestApp`].
pub struct Browser {
    pub client: Client,
    base_url: String,
}

impl Browser {
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Create an account and stay signed in as it.
    pub async fn sign_up(&self, email: &str) {
        let resp = self
            .post(
                "/signup",
                &[
                    ("email", email),
                    ("password", PASSWORD),
                    ("password_confirm", PASSWORD),
                ],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "signup failed");
        assert_eq!(location(&resp), "/dashboard");
    }

    /// Submit a complete order and return the response page.
    pub async fn place_order(&self, pickup: &str, description: &str) -> Response {
        self.post(
            "/order",
            &[
                ("region", "yaounde"),
                ("pickup_address", pickup),
                ("pickup_phone", "+237 650 000 001"),
                ("pickup_landmark", "Near Total Station"),
                ("pickup_instructions", ""),
                ("delivery_address", "Bastos, Rue 1.839"),
                ("delivery_phone", "+237 690 000 002"),
                ("delivery_landmark", "Behind the market"),
                ("delivery_instructions", "Call on arrival"),
                ("package_category", "electronics"),
                ("package_size", "medium"),
                ("package_value", "45000"),
                ("package_description", description),
                ("delivery_type", "express"),
                ("preferred_delivery_date", "2025-06-01"),
                ("payment_method", "mobile_money"),
            ],
        )
        .await
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Pull the new order ID out of the order form's confirmation.
#[must_use]
pub fn placed_order_id(html: &str) -> Option<String> {
    let start = html.find("Order ID: ")? + "Order ID: ".len();
    let rest = html.get(start..)?;
    let end = rest.find('<')?;
    rest.get(..end).map(|id| id.trim().to_string())
}
