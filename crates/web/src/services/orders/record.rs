//! Mapping between orders and stored documents.
//!
//! Field names match the documents the hosted app has always written, so
//! existing orders keep rendering.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use delivery_core::{ContactPoint, Order, OrderDraft, OrderId, OrderStatus, PackageDetails, Uid};

use super::error::OrderError;
use crate::backend::{Document, FieldValue, Identity, Record};

/// Collection holding every order.
pub const ORDERS: &str = "orders";

pub const OWNER_FIELD: &str = "userId";
pub const CREATED_FIELD: &str = "createdAt";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build the document for a new order placed by `owner`.
#[must_use]
pub fn order_record(owner: &Identity, draft: &OrderDraft) -> Record {
    let mut record = Record::new();
    record.insert(OWNER_FIELD.into(), owner.uid.as_str().into());
    record.insert("userEmail".into(), owner.email.as_str().into());
    record.insert("status".into(), OrderStatus::Pending.as_str().into());
    record.insert("pickupAddress".into(), contact_record(&draft.pickup_address).into());
    record.insert("deliveryAddress".into(), contact_record(&draft.delivery_address).into());
    record.insert("packageDetails".into(), package_record(&draft.package_details).into());
    record.insert("deliveryType".into(), draft.delivery_type.as_str().into());
    record.insert(
        "preferredDeliveryDate".into(),
        draft
            .preferred_delivery_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
            .into(),
    );
    record.insert("paymentMethod".into(), draft.payment_method.as_str().into());
    record.insert("region".into(), draft.region.as_str().into());
    record.insert(CREATED_FIELD.into(), FieldValue::ServerTimestamp);
    record.insert("updatedAt".into(), FieldValue::ServerTimestamp);
    record
}

fn contact_record(point: &ContactPoint) -> Record {
    let mut record = Record::new();
    record.insert("address".into(), point.address.as_str().into());
    record.insert("phone".into(), point.phone.as_str().into());
    record.insert("landmark".into(), point.landmark.as_str().into());
    record.insert("instructions".into(), point.instructions.as_str().into());
    record
}

fn package_record(package: &PackageDetails) -> Record {
    let mut record = Record::new();
    record.insert("size".into(), package.size.as_str().into());
    record.insert("category".into(), package.category.as_str().into());
    record.insert("description".into(), package.description.as_str().into());
    record.insert(
        "value".into(),
        package
            .value
            .map(|v| v.to_string())
            .unwrap_or_default()
            .into(),
    );
    record
}

/// Read a stored document back as an [`Order`].
///
/// # Errors
///
/// Returns `OrderError::Malformed` if a choice field holds an unknown value
/// or the owner is missing.
pub fn order_from_document(doc: &Document) -> Result<Order, OrderError> {
    let fields = &doc.fields;
    let malformed = |reason: String| OrderError::Malformed {
        id: doc.id.clone(),
        reason,
    };

    let owner = text(fields, OWNER_FIELD);
    if owner.is_empty() {
        return Err(malformed("missing owner".to_string()));
    }

    let package = map(fields, "packageDetails");
    let package_details = PackageDetails {
        size: choice(&package, "size").map_err(&malformed)?,
        category: choice(&package, "category").map_err(&malformed)?,
        description: text(&package, "description"),
        value: decimal(&package, "value").map_err(&malformed)?,
    };

    Ok(Order {
        id: OrderId::new(doc.id.clone()),
        owner_id: Uid::new(owner),
        owner_email: text(fields, "userEmail"),
        status: match text(fields, "status") {
            raw if raw.is_empty() => OrderStatus::default(),
            raw => OrderStatus::from(raw),
        },
        pickup_address: contact(&map(fields, "pickupAddress")),
        delivery_address: contact(&map(fields, "deliveryAddress")),
        package_details,
        delivery_type: choice(fields, "deliveryType").map_err(&malformed)?,
        preferred_delivery_date: date(fields, "preferredDeliveryDate").map_err(&malformed)?,
        payment_method: choice(fields, "paymentMethod").map_err(&malformed)?,
        region: choice(fields, "region").map_err(&malformed)?,
        created_at: fields.get(CREATED_FIELD).and_then(FieldValue::as_timestamp),
        updated_at: fields.get("updatedAt").and_then(FieldValue::as_timestamp),
    })
}

fn text(record: &Record, key: &str) -> String {
    record
        .get(key)
        .and_then(FieldValue::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn map(record: &Record, key: &str) -> Record {
    record
        .get(key)
        .and_then(FieldValue::as_map)
        .cloned()
        .unwrap_or_default()
}

fn contact(record: &Record) -> ContactPoint {
    ContactPoint {
        address: text(record, "address"),
        phone: text(record, "phone"),
        landmark: text(record, "landmark"),
        instructions: text(record, "instructions"),
    }
}

fn choice<T>(record: &Record, key: &str) -> Result<T, String>
where
    T: std::str::FromStr + Default,
    T::Err: std::fmt::Display,
{
    let raw = text(record, key);
    if raw.is_empty() {
        return Ok(T::default());
    }
    raw.parse().map_err(|e: T::Err| e.to_string())
}

fn decimal(record: &Record, key: &str) -> Result<Option<Decimal>, String> {
    match record.get(key) {
        Some(FieldValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(FieldValue::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
        Some(FieldValue::Integer(i)) => Ok(Some(Decimal::from(*i))),
        Some(FieldValue::Double(d)) => Ok(Decimal::try_from(*d).ok()),
        _ => Ok(None),
    }
}

fn date(record: &Record, key: &str) -> Result<Option<NaiveDate>, String> {
    let raw = text(record, key);
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map(Some)
        .map_err(|e| format!("{key}: {e}"))
}
