//! Order status as stored by the backend.
//!
//! The app only ever writes `pending`; the other states are set by
//! back-office tooling outside this codebase, so unknown values are kept
//! verbatim instead of being rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery order status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Delivered,
    Cancelled,
    /// Any status this app does not know about.
    Other(String),
}

impl OrderStatus {
    /// The value written to and read from the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }

    /// Badge background colour for order summaries.
    #[must_use]
    pub const fn badge_color(&self) -> &'static str {
        match self {
            Self::Pending => "#f39c12",
            Self::Processing => "#3498db",
            Self::Delivered => "#27ae60",
            Self::Cancelled => "#e74c3c",
            Self::Other(_) => "#95a5a6",
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(raw.to_owned()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!(OrderStatus::from("Delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from("CANCELLED").badge_color(), "#e74c3c");
    }

    #[test]
    fn test_unknown_status_kept_verbatim() {
        let status = OrderStatus::from("On Hold");
        assert_eq!(status.as_str(), "On Hold");
        assert_eq!(status.badge_color(), "#95a5a6");
    }

    #[test]
    fn test_default_is_pending() {
        assert_eq!(OrderStatus::default().as_str(), "pending");
        assert_eq!(OrderStatus::default().badge_color(), "#f39c12");
    }
}
