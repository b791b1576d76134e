//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::RequireIdentity;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Display the signed-in user's dashboard.
pub async fn dashboard(guard: RequireIdentity) -> impl IntoResponse {
    DashboardTemplate {
        email: guard.identity.email.to_string(),
        error: None,
    }
}
