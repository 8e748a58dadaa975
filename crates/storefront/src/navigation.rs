//! Navigation targets handed back to the front end.

use std::time::Duration;

/// Path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// Path of the order history view.
pub const ORDER_HISTORY_PATH: &str = "/orders";

/// Views that require an authenticated session, sub-paths included.
pub const PROTECTED_PATHS: &[&str] = &["/account", "/orders", "/checkout"];

/// Whether `path` is one of [`PROTECTED_PATHS`] or below one.
///
/// Query strings and fragments are ignored.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    PROTECTED_PATHS.iter().any(|protected| {
        path.strip_prefix(protected)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// A navigation the front end should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target path, possibly with a query string.
    pub location: String,
    /// How long to wait before navigating.
    pub delay: Duration,
}

impl Redirect {
    /// Navigate immediately.
    #[must_use]
    pub fn to(location: impl Into<String>) -> Self {
        Self::after(location, Duration::ZERO)
    }

    /// Navigate after `delay`.
    #[must_use]
    pub fn after(location: impl Into<String>, delay: Duration) -> Self {
        Self {
            location: location.into(),
            delay,
        }
    }

    /// Send an anonymous visitor to the login view, remembering where they
    /// were headed.
    #[must_use]
    pub fn to_login(return_to: &str) -> Self {
        Self::to(format!(
            "{LOGIN_PATH}?redirect={}",
            urlencoding::encode(return_to)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_protected() {
        assert!(is_protected("/account"));
        assert!(is_protected("/orders/ord-1"));
        assert!(is_protected("/checkout?step=2"));
        assert!(!is_protected("/"));
        assert!(!is_protected("/products/apple"));
        assert!(!is_protected("/ordersummary"));
        assert!(!is_protected("/login"));
    }

    #[test]
    fn test_to_login_encodes_return_path() {
        let redirect = Redirect::to_login("/orders/ord-1");
        assert_eq!(redirect.location, "/login?redirect=%2Forders%2Ford-1");
        assert_eq!(redirect.delay, Duration::ZERO);
    }
}
