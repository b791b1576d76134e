//! Last-resort recovery page.
//!
//! Two pieces cooperate: [`catch_panic_layer`] turns a handler panic into a
//! response, and [`error_boundary_middleware`] swaps any 500 response for the
//! static recovery page. Neither looks at what actually failed; a reload is
//! the only way out.

use std::any::Any;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

/// Static page rendered in place of a failed response.
pub const RECOVERY_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Something went wrong</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
    <main class="container recovery">
        <h1>Something went wrong.</h1>
        <a class="button" href="">Reload Page</a>
    </main>
</body>
</html>
"#;

/// Build the recovery response.
#[must_use]
pub fn recovery_response() -> Response {
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Html(RECOVERY_PAGE)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Panic handler for [`CatchPanicLayer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RecoverFromPanic;

impl ResponseForPanic for RecoverFromPanic {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let detail = err
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| err.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        tracing::error!(panic = %detail, "handler panicked");
        recovery_response()
    }
}

/// Layer that converts handler panics into the recovery page.
#[must_use]
pub fn catch_panic_layer() -> CatchPanicLayer<RecoverFromPanic> {
    CatchPanicLayer::custom(RecoverFromPanic)
}

/// Replace every 500 response with the recovery page.
pub async fn error_boundary_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::warn!("internal error replaced with recovery page");
        return recovery_response();
    }

    response
}
