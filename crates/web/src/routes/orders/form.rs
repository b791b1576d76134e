//! Order submission form.
//!
//! The form keeps every field as the raw submitted text so a failed
//! submission re-renders exactly what the user typed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use delivery_core::{
    ContactPoint, DeliveryType, OrderDraft, PackageCategory, PackageDetails, PackageSize,
    PaymentMethod, Region, UnknownChoice,
};

use super::{SelectOption, format_timestamp, select_options};
use crate::error::{order_status, report_order_error};
use crate::filters;
use crate::middleware::{ExistingSession, RequireIdentity};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Order form fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub region: String,
    pub pickup_address: String,
    pub pickup_phone: String,
    pub pickup_landmark: String,
    pub pickup_instructions: String,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub delivery_landmark: String,
    pub delivery_instructions: String,
    pub package_category: String,
    pub package_size: String,
    pub package_value: String,
    pub package_description: String,
    pub delivery_type: String,
    pub preferred_delivery_date: String,
    pub payment_method: String,
}

/// Why a submitted form was not turned into an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill in the {0}.")]
    Missing(&'static str),

    #[error("Package value must be a number of FCFA, 0 or more.")]
    InvalidValue,

    #[error("Preferred delivery date must be a valid date.")]
    InvalidDate,

    #[error("Please choose a valid {}.", .0.kind)]
    UnknownChoice(#[from] UnknownChoice),
}

impl OrderForm {
    /// A fresh form: small general package, standard delivery, cash, and
    /// `region` preselected.
    #[must_use]
    pub fn defaults(region: Region) -> Self {
        let draft = OrderDraft::with_region(region);
        Self {
            region: draft.region.as_str().to_string(),
            package_category: draft.package_details.category.as_str().to_string(),
            package_size: draft.package_details.size.as_str().to_string(),
            delivery_type: draft.delivery_type.as_str().to_string(),
            payment_method: draft.payment_method.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Validate the fields and build the order draft.
    ///
    /// Text is kept exactly as typed; blanks count as missing.
    ///
    /// # Errors
    ///
    /// Returns the first missing required field, a non-numeric package
    /// value, an unparseable date or an unknown choice.
    pub fn to_draft(&self) -> Result<OrderDraft, FormError> {
        let pickup_address = ContactPoint {
            address: required(&self.pickup_address, "pickup address")?,
            phone: required(&self.pickup_phone, "pickup phone number")?,
            landmark: required(&self.pickup_landmark, "pickup landmark")?,
            instructions: self.pickup_instructions.clone(),
        };
        let delivery_address = ContactPoint {
            address: required(&self.delivery_address, "delivery address")?,
            phone: required(&self.delivery_phone, "recipient phone number")?,
            landmark: required(&self.delivery_landmark, "delivery landmark")?,
            instructions: self.delivery_instructions.clone(),
        };

        let value = required(&self.package_value, "package value")?
            .trim()
            .parse::<Decimal>()
            .ok()
            .filter(|v| !v.is_sign_negative())
            .ok_or(FormError::InvalidValue)?;

        let package_details = PackageDetails {
            size: self.package_size.parse::<PackageSize>()?,
            category: self.package_category.parse::<PackageCategory>()?,
            description: required(&self.package_description, "package description")?,
            value: Some(value),
        };

        let date = required(&self.preferred_delivery_date, "preferred delivery date")?;
        let preferred_delivery_date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| FormError::InvalidDate)?;

        Ok(OrderDraft {
            pickup_address,
            delivery_address,
            package_details,
            delivery_type: self.delivery_type.parse::<DeliveryType>()?,
            preferred_delivery_date: Some(preferred_delivery_date),
            payment_method: self.payment_method.parse::<PaymentMethod>()?,
            region: self.region.parse::<Region>()?,
        })
    }
}

/// The field as typed, unless it is blank.
fn required(raw: &str, field: &'static str) -> Result<String, FormError> {
    if raw.trim().is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(raw.to_string())
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Confirmation shown after an order is placed.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub id: String,
    pub submitted_at: String,
}

/// Order form page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/form.html")]
pub struct OrderFormTemplate {
    pub form: OrderForm,
    pub error: Option<String>,
    pub placed: Option<PlacedOrder>,
    pub regions: Vec<SelectOption>,
    pub sizes: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub delivery_types: Vec<SelectOption>,
    pub payment_methods: Vec<SelectOption>,
}

impl OrderFormTemplate {
    fn new(form: OrderForm, error: Option<String>, placed: Option<PlacedOrder>) -> Self {
        Self {
            regions: select_options(Region::ALL, &form.region, |c| (c.as_str(), c.label())),
            sizes: select_options(PackageSize::ALL, &form.package_size, |c| {
                (c.as_str(), c.label())
            }),
            categories: select_options(PackageCategory::ALL, &form.package_category, |c| {
                (c.as_str(), c.label())
            }),
            delivery_types: select_options(DeliveryType::ALL, &form.delivery_type, |c| {
                (c.as_str(), c.label())
            }),
            payment_methods: select_options(PaymentMethod::ALL, &form.payment_method, |c| {
                (c.as_str(), c.label())
            }),
            form,
            error,
            placed,
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display an empty order form.
pub async fn show(State(state): State<AppState>, _guard: RequireIdentity) -> impl IntoResponse {
    OrderFormTemplate::new(OrderForm::defaults(state.config().default_region), None, None)
}

/// Handle order form submission.
///
/// On success the form is reset and the new order's ID is shown; on failure
/// the submitted values are kept.
pub async fn submit(
    State(state): State<AppState>,
    session: ExistingSession,
    form: Result<Form<OrderForm>, FormRejection>,
) -> Response {
    let default_region = state.config().default_region;

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "order form could not be decoded");
            let template = OrderFormTemplate::new(
                OrderForm::defaults(default_region),
                Some(format!("Failed to create order: {}", rejection.body_text())),
                None,
            );
            return (StatusCode::BAD_REQUEST, template).into_response();
        }
    };

    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(e) => {
            tracing::debug!(error = %e, "order form rejected");
            let template = OrderFormTemplate::new(form, Some(e.to_string()), None);
            return (StatusCode::UNPROCESSABLE_ENTITY, template).into_response();
        }
    };

    let caller = session.caller().await;
    match state.orders().submit(caller.as_ref(), &draft).await {
        Ok(id) => {
            let placed = PlacedOrder {
                id: id.into_inner(),
                submitted_at: format_timestamp(Some(&Utc::now())),
            };
            OrderFormTemplate::new(OrderForm::defaults(default_region), None, Some(placed))
                .into_response()
        }
        Err(e) => {
            report_order_error(&e);
            let template = OrderFormTemplate::new(form, Some(e.submit_message()), None);
            (order_status(&e), template).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn filled() -> OrderForm {
        OrderForm {
            pickup_address: "Rue Joss, Akwa".into(),
            pickup_phone: "+237 650 000 001".into(),
            pickup_landmark: "Near Total Station".into(),
            delivery_address: "Bonapriso".into(),
            delivery_phone: "+237 690 000 002".into(),
            delivery_landmark: "Behind Market".into(),
            delivery_instructions: "  Ring twice  ".into(),
            package_value: "12500".into(),
            package_description: "Phone charger".into(),
            preferred_delivery_date: "2025-06-01".into(),
            ..OrderForm::defaults(Region::Douala)
        }
    }

    #[test]
    fn test_defaults() {
        let form = OrderForm::defaults(Region::Kumba);
        assert_eq!(form.region, "kumba");
        assert_eq!(form.package_size, "small");
        assert_eq!(form.package_category, "general");
        assert_eq!(form.delivery_type, "standard");
        assert_eq!(form.payment_method, "cash");
        assert!(form.pickup_address.is_empty());
    }

    #[test]
    fn test_filled_form_builds_draft() {
        let draft = filled().to_draft().unwrap();
        assert_eq!(draft.pickup_address.address, "Rue Joss, Akwa");
        assert_eq!(draft.delivery_address.instructions, "  Ring twice  ");
        assert_eq!(
            draft.package_details.value,
            Some(Decimal::from_str("12500").unwrap())
        );
        assert_eq!(draft.package_details.size, PackageSize::Small);
        assert_eq!(draft.region, Region::Douala);
        assert_eq!(
            draft.preferred_delivery_date,
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn test_missing_field_is_named() {
        let form = OrderForm {
            pickup_landmark: "   ".into(),
            ..filled()
        };
        assert_eq!(
            form.to_draft().unwrap_err(),
            FormError::Missing("pickup landmark")
        );
        assert_eq!(
            form.to_draft().unwrap_err().to_string(),
            "Please fill in the pickup landmark."
        );
    }

    #[test]
    fn test_text_is_stored_as_typed() {
        let form = OrderForm {
            pickup_address: " Rue Joss,  Akwa ".into(),
            package_description: "Phone charger\n(boxed)".into(),
            package_value: " 12500 ".into(),
            preferred_delivery_date: " 2025-06-01".into(),
            ..filled()
        };
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.pickup_address.address, " Rue Joss,  Akwa ");
        assert_eq!(draft.package_details.description, "Phone charger\n(boxed)");
        assert_eq!(
            draft.package_details.value,
            Some(Decimal::from_str("12500").unwrap())
        );
        assert_eq!(
            draft.preferred_delivery_date,
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn test_instructions_are_optional() {
        let form = OrderForm {
            pickup_instructions: String::new(),
            delivery_instructions: String::new(),
            ..filled()
        };
        assert!(form.to_draft().is_ok());
    }

    #[test]
    fn test_value_must_be_numeric() {
        for bad in ["abc", "-5", "12,5"] {
            let form = OrderForm {
                package_value: bad.into(),
                ..filled()
            };
            assert_eq!(form.to_draft().unwrap_err(), FormError::InvalidValue, "{bad}");
        }
    }

    #[test]
    fn test_date_must_parse() {
        let form = OrderForm {
            preferred_delivery_date: "01/06/2025".into(),
            ..filled()
        };
        assert_eq!(form.to_draft().unwrap_err(), FormError::InvalidDate);
    }

    #[test]
    fn test_unknown_choice_rejected() {
        let form = OrderForm {
            region: "atlantis".into(),
            ..filled()
        };
        assert_eq!(
            form.to_draft().unwrap_err().to_string(),
            "Please choose a valid region."
        );
    }
}
