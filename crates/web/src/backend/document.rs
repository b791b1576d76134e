//! Document store contract.
//!
//! Documents are schemaless maps of typed field values grouped into named
//! collections. Queries are limited to what the app needs: one equality
//! filter plus an optional sort.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use thiserror::Error;

/// The fields of a document.
pub type Record = BTreeMap<String, FieldValue>;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Map(Record),
    /// Replaced by the backend's clock when the write is applied.
    ServerTimestamp,
}

impl FieldValue {
    /// The string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The nested record, if this is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The timestamp payload, if this is a resolved timestamp.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Total order used for sorting query results.
    ///
    /// Values of different kinds sort by kind (null first), mirroring how
    /// the hosted backend orders mixed-type fields.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Integer(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Double(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    const fn kind_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::Timestamp(_) | Self::ServerTimestamp => 3,
            Self::String(_) => 4,
            Self::Map(_) => 5,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        Self::Map(value)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Backend-assigned document ID.
    pub id: String,
    pub fields: Record,
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// An equality query with an optional sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub field: String,
    pub value: FieldValue,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    /// Match documents whose `field` equals `value`.
    #[must_use]
    pub fn where_eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            order_by: None,
        }
    }

    /// Sort results by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }
}

/// Error codes reported by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// The query needs an index or other setup that isn't ready yet.
    FailedPrecondition,
    PermissionDenied,
    NotFound,
    Unauthenticated,
    InvalidArgument,
    /// Network failure or backend outage.
    Unavailable,
    Unknown,
}

impl StoreErrorCode {
    /// Map the backend's canonical status name.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status {
            "FAILED_PRECONDITION" => Self::FailedPrecondition,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "NOT_FOUND" => Self::NotFound,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "UNAVAILABLE" | "DEADLINE_EXCEEDED" => Self::Unavailable,
            _ => Self::Unknown,
        }
    }

    /// Kebab-case code as shown in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailedPrecondition => "failed-precondition",
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument => "invalid-argument",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    /// Backend message, kept verbatim for display.
    pub message: String,
}

impl StoreError {
    /// Create a store error.
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(StoreErrorCode::Unavailable, err.to_string())
    }
}

/// Collection-oriented document operations.
///
/// Every call carries the caller's ID token so the backend can apply its
/// own access rules.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document and return its backend-assigned ID.
    async fn insert(
        &self,
        token: &SecretString,
        collection: &str,
        record: Record,
    ) -> Result<String, StoreError>;

    /// Fetch one document, `None` if it does not exist.
    async fn get_by_id(
        &self,
        token: &SecretString,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Fetch every document matching `query`.
    async fn query_where(
        &self,
        token: &SecretString,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError>;
}
