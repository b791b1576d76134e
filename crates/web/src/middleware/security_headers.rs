//! Security headers for the order pages.
//!
//! The app serves plain HTML forms and one same-origin stylesheet, so the
//! policy allows exactly that. Pages carry order addresses and phone
//! numbers and are never cached; the stylesheet is fingerprinted with
//! `?v=<hash>` and cached for a year.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content policy: forms post to this origin, badges colour themselves
/// with inline `style` attributes, and nothing else runs or loads.
const CONTENT_POLICY: &str = "default-src 'none'; \
     style-src 'self'; \
     style-src-attr 'unsafe-inline'; \
     base-uri 'none'; \
     form-action 'self'; \
     frame-ancestors 'none'";

/// Browser features none of the pages use.
const PERMISSIONS_POLICY: &str = "camera=(), \
     geolocation=(), \
     microphone=(), \
     payment=(), \
     usb=(), \
     browsing-topics=(), \
     interest-cohort=()";

/// Cache policy for order pages.
const NO_STORE: &str = "no-store, max-age=0";

/// Cache policy for fingerprinted assets under `/static`.
const ASSET_CACHE: &str = "public, max-age=31536000, immutable";

/// Add security and cache headers to every response.
///
/// The waiting page refreshes itself with `<meta http-equiv="refresh">`,
/// which the content policy does not restrict.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_asset = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let cache = if is_asset && response.status().is_success() {
        ASSET_CACHE
    } else {
        NO_STORE
    };

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache));

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_POLICY),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}
