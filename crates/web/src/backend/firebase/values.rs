//! Firestore REST value encoding.
//!
//! Firestore wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "douala"}` or `{"integerValue": "42"}`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::backend::document::{Document, FieldValue, Record};

/// Encode a record as a Firestore `fields` object.
///
/// Server timestamp sentinels cannot be written as values; they are left
/// out here and reported by [`server_timestamp_paths`] instead.
pub(super) fn encode_fields(record: &Record) -> Value {
    let fields: Map<String, Value> = record
        .iter()
        .filter(|(_, value)| !matches!(value, FieldValue::ServerTimestamp))
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Value::Object(fields)
}

/// Encode one value.
pub(super) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null | FieldValue::ServerTimestamp => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(t) => json!({ "timestampValue": t.to_rfc3339() }),
        FieldValue::Map(inner) => json!({ "mapValue": { "fields": encode_fields(inner) } }),
    }
}

/// Dotted field paths of every server timestamp sentinel in `record`.
pub(super) fn server_timestamp_paths(record: &Record) -> Vec<String> {
    let mut paths = Vec::new();
    collect_sentinels(record, "", &mut paths);
    paths
}

fn collect_sentinels(record: &Record, prefix: &str, paths: &mut Vec<String>) {
    for (key, value) in record {
        let path = if prefix.is_empty() {
            quote_segment(key)
        } else {
            format!("{prefix}.{}", quote_segment(key))
        };
        match value {
            FieldValue::ServerTimestamp => paths.push(path),
            FieldValue::Map(inner) => collect_sentinels(inner, &path, paths),
            _ => {}
        }
    }
}

/// Backtick-quote a field name unless it is a plain identifier.
fn quote_segment(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Decode a Firestore document resource.
pub(super) fn decode_document(value: &Value) -> Option<Document> {
    let name = value.get("name")?.as_str()?;
    let id = name.rsplit('/').next()?.to_owned();
    let fields = value
        .get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default();
    Some(Document { id, fields })
}

fn decode_fields(fields: &Map<String, Value>) -> Record {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Decode one value. Types the app never writes decode as null.
pub(super) fn decode_value(value: &Value) -> FieldValue {
    let Some((kind, payload)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return FieldValue::Null;
    };

    match kind.as_str() {
        "nullValue" => FieldValue::Null,
        "booleanValue" => payload.as_bool().map_or(FieldValue::Null, FieldValue::Bool),
        "integerValue" => payload
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| payload.as_i64())
            .map_or(FieldValue::Null, FieldValue::Integer),
        "doubleValue" => payload.as_f64().map_or(FieldValue::Null, FieldValue::Double),
        "stringValue" | "referenceValue" => payload
            .as_str()
            .map_or(FieldValue::Null, |s| FieldValue::String(s.to_owned())),
        "timestampValue" => payload
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or(FieldValue::Null, |t| {
                FieldValue::Timestamp(t.with_timezone(&Utc))
            }),
        "mapValue" => FieldValue::Map(
            payload
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        other => {
            tracing::debug!(kind = other, "unsupported Firestore value type");
            FieldValue::Null
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_record() -> Record {
        let mut pickup = Record::new();
        pickup.insert("address".into(), "Rue Joss".into());
        pickup.insert("phone".into(), "+237 6 70 00 00 00".into());

        let mut record = Record::new();
        record.insert("userId".into(), "u1".into());
        record.insert("pickupAddress".into(), pickup.into());
        record.insert("createdAt".into(), FieldValue::ServerTimestamp);
        record.insert("updatedAt".into(), FieldValue::ServerTimestamp);
        record
    }

    #[test]
    fn test_encode_leaves_out_sentinels() {
        let fields = encode_fields(&sample_record());
        assert_eq!(fields["userId"], json!({ "stringValue": "u1" }));
        assert_eq!(
            fields["pickupAddress"]["mapValue"]["fields"]["address"],
            json!({ "stringValue": "Rue Joss" })
        );
        assert!(fields.get("createdAt").is_none());
    }

    #[test]
    fn test_server_timestamp_paths() {
        let mut nested = Record::new();
        nested.insert("seen at".into(), FieldValue::ServerTimestamp);
        let mut record = sample_record();
        record.insert("audit".into(), nested.into());

        assert_eq!(
            server_timestamp_paths(&record),
            ["audit.`seen at`", "createdAt", "updatedAt"]
        );
    }

    #[test]
    fn test_decode_document() {
        let raw = json!({
            "name": "projects/demo/databases/(default)/documents/orders/AbC123",
            "fields": {
                "userId": { "stringValue": "u1" },
                "count": { "integerValue": "3" },
                "createdAt": { "timestampValue": "2024-03-01T10:15:00.123456Z" },
                "packageDetails": { "mapValue": { "fields": {
                    "size": { "stringValue": "small" }
                }}},
                "tags": { "arrayValue": { "values": [] } }
            },
            "createTime": "2024-03-01T10:15:00.123456Z"
        });

        let doc = decode_document(&raw).unwrap();
        assert_eq!(doc.id, "AbC123");
        assert_eq!(doc.fields["userId"].as_str(), Some("u1"));
        assert_eq!(doc.fields["count"], FieldValue::Integer(3));
        assert_eq!(
            doc.fields["createdAt"].as_timestamp().unwrap().timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap().timestamp()
        );
        let package = doc.fields["packageDetails"].as_map().unwrap();
        assert_eq!(package["size"].as_str(), Some("small"));
        assert_eq!(doc.fields["tags"], FieldValue::Null);
    }

    #[test]
    fn test_decode_empty_map_and_null() {
        assert_eq!(
            decode_value(&json!({ "mapValue": {} })),
            FieldValue::Map(Record::new())
        );
        assert_eq!(decode_value(&json!({ "nullValue": null })), FieldValue::Null);
    }
}
