//! Route guard decisions.
//!
//! The guard is a pure function of the session state and the requested
//! path. Applying the decision (waiting page, redirect, or handler) is the
//! job of the `RequireIdentity` extractor.

use crate::backend::Identity;

use super::store::SessionState;

/// What to do with a request for a guarded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is still loading; show a neutral waiting page.
    Wait,
    /// No one is signed in; redirect to this location.
    Redirect(String),
    /// Render the guarded page for this identity.
    Render(Identity),
}

/// Decide how to answer a request for `requested`.
#[must_use]
pub fn decide(state: &SessionState, requested: &str) -> GuardDecision {
    if state.is_loading {
        return GuardDecision::Wait;
    }
    match &state.identity {
        Some(identity) => GuardDecision::Render(identity.clone()),
        None => GuardDecision::Redirect(login_redirect(requested)),
    }
}

/// Login URL that returns to `requested` afterwards.
#[must_use]
pub fn login_redirect(requested: &str) -> String {
    format!("/login?from={}", urlencoding::encode(requested))
}

/// Accept a post-login destination only if it stays on this site.
///
/// Browsers drop tabs and newlines from a `Location` and treat `\` as `/`,
/// so `/\t/host` would leave the site. Any control or whitespace character
/// rejects the path outright.
#[must_use]
pub fn safe_return_path(from: Option<&str>) -> Option<&str> {
    from.filter(|path| {
        path.starts_with('/')
            && !path.starts_with("//")
            && !path
                .chars()
                .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delivery_core::{Email, Uid};

    use super::*;

    fn signed_in() -> SessionState {
        SessionState {
            identity: Some(Identity {
                uid: Uid::new("u1"),
                email: Email::parse("u1@example.com").unwrap(),
            }),
            is_loading: false,
            last_error: None,
        }
    }

    #[test]
    fn test_never_renders_while_loading() {
        let mut loading = signed_in();
        loading.is_loading = true;
        assert_eq!(decide(&loading, "/my-orders"), GuardDecision::Wait);
        assert_eq!(
            decide(&SessionState::loading(), "/my-orders"),
            GuardDecision::Wait
        );
    }

    #[test]
    fn test_redirects_when_signed_out() {
        let mut state = SessionState::loading();
        state.is_loading = false;
        assert_eq!(
            decide(&state, "/orders/abc"),
            GuardDecision::Redirect("/login?from=%2Forders%2Fabc".to_string())
        );
    }

    #[test]
    fn test_renders_for_identity() {
        let state = signed_in();
        let GuardDecision::Render(identity) = decide(&state, "/order") else {
            panic!("expected render");
        };
        assert_eq!(identity.uid.as_str(), "u1");
    }

    #[test]
    fn test_last_error_does_not_block_render() {
        let mut state = signed_in();
        state.last_error = Some("TOKEN_EXPIRED".into());
        assert!(matches!(decide(&state, "/order"), GuardDecision::Render(_)));
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/my-orders")), Some("/my-orders"));
        assert_eq!(safe_return_path(Some("//evil.example")), None);
        assert_eq!(safe_return_path(Some("https://evil.example")), None);
        assert_eq!(safe_return_path(Some("/\\evil.example")), None);
        assert_eq!(safe_return_path(None), None);
    }

    #[test]
    fn test_safe_return_path_rejects_stripped_characters() {
        for sneaky in [
            "/\t/evil.example/phish",
            "/\n/evil.example",
            "/\r\n/evil.example",
            "/ /evil.example",
            "/\u{0}/evil.example",
            "/\u{a0}/evil.example",
        ] {
            assert_eq!(safe_return_path(Some(sneaky)), None, "{sneaky:?}");
        }
        assert_eq!(
            safe_return_path(Some("/orders/abc?tab=detail")),
            Some("/orders/abc?tab=detail")
        );
    }
}
