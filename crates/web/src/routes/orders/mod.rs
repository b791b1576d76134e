//! Order route handlers: the order form, the order list and order detail.

pub mod detail;
pub mod form;
pub mod list;

use chrono::{DateTime, Utc};

use delivery_core::{ContactPoint, Order};

/// One `<option>` of a form select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Options for `choices`, with the one matching `current` selected.
pub fn select_options<T: Copy>(
    choices: &[T],
    current: &str,
    parts: impl Fn(T) -> (&'static str, &'static str),
) -> Vec<SelectOption> {
    choices
        .iter()
        .map(|&choice| {
            let (value, label) = parts(choice);
            SelectOption {
                value,
                label,
                selected: value.eq_ignore_ascii_case(current),
            }
        })
        .collect()
}

/// Display form of a timestamp, or "N/A" when the backend has not set it.
#[must_use]
pub fn format_timestamp(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(
        || "N/A".to_string(),
        |ts| ts.format("%b %-d, %Y %H:%M UTC").to_string(),
    )
}

/// Status badge shown on summaries and detail.
#[derive(Debug, Clone)]
pub struct StatusBadge {
    pub label: String,
    pub color: &'static str,
}

impl StatusBadge {
    fn of(order: &Order) -> Self {
        Self {
            label: order.status.to_string(),
            color: order.status.badge_color(),
        }
    }
}

/// A pickup or drop-off point as rendered.
#[derive(Debug, Clone)]
pub struct ContactView {
    pub address: String,
    pub phone: String,
    pub landmark: String,
    /// Empty when none were given; the template hides the row.
    pub instructions: String,
}

impl From<&ContactPoint> for ContactView {
    fn from(point: &ContactPoint) -> Self {
        Self {
            address: point.address.clone(),
            phone: point.phone.clone(),
            landmark: point.landmark.clone(),
            instructions: point.instructions.trim().to_string(),
        }
    }
}
