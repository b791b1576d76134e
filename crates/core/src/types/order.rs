//! Delivery order records and the fixed choices offered on the order form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, Uid};
use super::status::OrderStatus;

/// A value that is not one of the allowed choices for a field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownChoice {
    /// Which field the value was meant for.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

/// Defines a closed set of form choices.
///
/// Each variant carries the backend value and the label shown in the form.
/// Parsing is case-insensitive; serialization always emits the backend value.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every choice, in form order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The value stored in the backend.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            /// The human-readable label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| UnknownChoice {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownChoice;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(choice: $name) -> Self {
                choice.as_str().to_owned()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// Package weight class.
    PackageSize, "package size" {
        Small => ("small", "Small Package (Up to 5kg)"),
        Medium => ("medium", "Medium Package (5-15kg)"),
        Large => ("large", "Large Package (15kg+)"),
    }
}

choice_enum! {
    /// What the package contains.
    PackageCategory, "package category" {
        General => ("general", "General Package"),
        Food => ("food", "Food Items"),
        Electronics => ("electronics", "Electronics"),
        Clothing => ("clothing", "Clothing"),
        Documents => ("documents", "Documents"),
        Fragile => ("fragile", "Fragile Items"),
    }
}

choice_enum! {
    /// Delivery speed.
    DeliveryType, "delivery type" {
        Standard => ("standard", "Standard Delivery (24-48 hours)"),
        Express => ("express", "Express Delivery (Same day)"),
        Scheduled => ("scheduled", "Scheduled Delivery"),
    }
}

choice_enum! {
    /// How the sender pays.
    PaymentMethod, "payment method" {
        Cash => ("cash", "Cash on Delivery"),
        MobileMoney => ("mobile_money", "Mobile Money (MTN, Orange, etc.)"),
        Bank => ("bank", "Bank Transfer"),
    }
}

choice_enum! {
    /// Service region the pickup happens in.
    Region, "region" {
        Douala => ("douala", "Douala"),
        Yaounde => ("yaounde", "Yaoundé"),
        Bamenda => ("bamenda", "Bamenda"),
        Bafoussam => ("bafoussam", "Bafoussam"),
        Garoua => ("garoua", "Garoua"),
        Maroua => ("maroua", "Maroua"),
        Ngaoundere => ("ngaoundere", "Ngaoundéré"),
        Bertoua => ("bertoua", "Bertoua"),
        Kumba => ("kumba", "Kumba"),
        Limbe => ("limbe", "Limbé"),
    }
}

impl Default for PackageSize {
    fn default() -> Self {
        Self::Small
    }
}

impl Default for PackageCategory {
    fn default() -> Self {
        Self::General
    }
}

impl Default for DeliveryType {
    fn default() -> Self {
        Self::Standard
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Cash
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::Douala
    }
}

/// A pickup or drop-off point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactPoint {
    pub address: String,
    pub phone: String,
    pub landmark: String,
    /// Free-form notes for the courier; may be empty.
    pub instructions: String,
}

/// What is being delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageDetails {
    pub size: PackageSize,
    pub category: PackageCategory,
    pub description: String,
    /// Declared value in FCFA.
    pub value: Option<Decimal>,
}

/// The fields a user fills in before an order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub pickup_address: ContactPoint,
    pub delivery_address: ContactPoint,
    pub package_details: PackageDetails,
    pub delivery_type: DeliveryType,
    pub preferred_delivery_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub region: Region,
}

impl OrderDraft {
    /// A blank draft with the form defaults and the given region preselected.
    #[must_use]
    pub fn with_region(region: Region) -> Self {
        Self {
            pickup_address: ContactPoint::default(),
            delivery_address: ContactPoint::default(),
            package_details: PackageDetails::default(),
            delivery_type: DeliveryType::default(),
            preferred_delivery_date: None,
            payment_method: PaymentMethod::default(),
            region,
        }
    }
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self::with_region(Region::default())
    }
}

/// A persisted delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: Uid,
    pub owner_email: String,
    pub status: OrderStatus,
    pub pickup_address: ContactPoint,
    pub delivery_address: ContactPoint,
    pub package_details: PackageDetails,
    pub delivery_type: DeliveryType,
    pub preferred_delivery_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub region: Region,
    /// Server-assigned; absent only while a write is still settling.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `uid` created this order.
    #[must_use]
    pub fn is_owned_by(&self, uid: &Uid) -> bool {
        &self.owner_id == uid
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let draft = OrderDraft::default();
        assert_eq!(draft.package_details.size, PackageSize::Small);
        assert_eq!(draft.package_details.category, PackageCategory::General);
        assert_eq!(draft.delivery_type, DeliveryType::Standard);
        assert_eq!(draft.payment_method, PaymentMethod::Cash);
        assert_eq!(draft.region, Region::Douala);
        assert!(draft.package_details.value.is_none());
        assert!(draft.preferred_delivery_date.is_none());
    }

    #[test]
    fn test_with_region_keeps_other_defaults() {
        let draft = OrderDraft::with_region(Region::Limbe);
        assert_eq!(draft.region, Region::Limbe);
        assert_eq!(draft.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_choice_parsing() {
        assert_eq!("Express".parse::<DeliveryType>().unwrap(), DeliveryType::Express);
        assert_eq!(
            "mobile_money".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::MobileMoney
        );
        let err = "north".parse::<Region>().unwrap_err();
        assert_eq!(err.kind, "region");
        assert_eq!(err.value, "north");
    }

    #[test]
    fn test_choice_labels() {
        assert_eq!(Region::Yaounde.label(), "Yaoundé");
        assert_eq!(Region::ALL.len(), 10);
        assert_eq!(PackageCategory::ALL.first(), Some(&PackageCategory::General));
    }

    #[test]
    fn test_choice_serde_uses_backend_value() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileMoney).unwrap(),
            "\"mobile_money\""
        );
        let size: PackageSize = serde_json::from_str("\"LARGE\"").unwrap();
        assert_eq!(size, PackageSize::Large);
    }

    #[test]
    fn test_ownership_check() {
        let order = Order {
            id: OrderId::new("o1"),
            owner_id: Uid::new("alice"),
            owner_email: "alice@example.com".to_string(),
            status: OrderStatus::Pending,
            pickup_address: ContactPoint::default(),
            delivery_address: ContactPoint::default(),
            package_details: PackageDetails::default(),
            delivery_type: DeliveryType::Standard,
            preferred_delivery_date: None,
            payment_method: PaymentMethod::Cash,
            region: Region::Douala,
            created_at: None,
            updated_at: None,
        };
        assert!(order.is_owned_by(&Uid::new("alice")));
        assert!(!order.is_owned_by(&Uid::new("bob")));
    }
}
