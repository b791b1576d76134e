//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::ExistingSession;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
}

/// Display the public landing page.
pub async fn home(session: ExistingSession) -> impl IntoResponse {
    HomeTemplate {
        signed_in: session.caller().await.is_some(),
    }
}
