//! Firestore document calls.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;

use super::values::{decode_document, encode_fields, encode_value, server_timestamp_paths};
use super::{FIRESTORE_ENDPOINT, FirebaseBackend, parse_error_body};
use crate::backend::document::{
    Direction, Document, DocumentStore, Query, Record, StoreError, StoreErrorCode,
};
use crate::backend::random_id;

impl FirebaseBackend {
    /// Full resource name of a document.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root())
    }

    fn endpoint(&self, suffix: &str) -> Result<Url, StoreError> {
        Url::parse(&format!("{FIRESTORE_ENDPOINT}/{}{suffix}", self.documents_root()))
            .map_err(|e| StoreError::new(StoreErrorCode::InvalidArgument, e.to_string()))
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        let mut url = self.endpoint("")?;
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::new(StoreErrorCode::InvalidArgument, "endpoint cannot hold a path")
            })?
            .push(collection)
            .push(id);
        Ok(url)
    }

    /// Send a request and return the JSON body, mapping error responses.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(store_error(status, &text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for FirebaseBackend {
    async fn insert(
        &self,
        token: &SecretString,
        collection: &str,
        record: Record,
    ) -> Result<String, StoreError> {
        let id = random_id(20);
        let transforms: Vec<Value> = server_timestamp_paths(&record)
            .into_iter()
            .map(|path| json!({ "fieldPath": path, "setToServerValue": "REQUEST_TIME" }))
            .collect();

        let body = json!({
            "writes": [{
                "update": {
                    "name": self.document_name(collection, &id),
                    "fields": encode_fields(&record),
                },
                "updateTransforms": transforms,
                "currentDocument": { "exists": false },
            }]
        });

        let request = self
            .client()
            .post(self.endpoint(":commit")?)
            .bearer_auth(token.expose_secret())
            .json(&body);
        self.send(request).await?;

        tracing::debug!(collection, id = %id, "document committed");
        Ok(id)
    }

    async fn get_by_id(
        &self,
        token: &SecretString,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let request = self
            .client()
            .get(self.document_url(collection, id)?)
            .bearer_auth(token.expose_secret());

        match self.send(request).await {
            Ok(raw) => decode_document(&raw).map(Some).ok_or_else(|| {
                StoreError::new(StoreErrorCode::Unknown, "malformed document response")
            }),
            Err(err) if err.code == StoreErrorCode::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn query_where(
        &self,
        token: &SecretString,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let request = self
            .client()
            .post(self.endpoint(":runQuery")?)
            .bearer_auth(token.expose_secret())
            .json(&structured_query(collection, query));

        let raw = self.send(request).await?;
        let rows = raw.as_array().map(Vec::as_slice).unwrap_or_default();

        // Rows without a document only carry progress metadata.
        Ok(rows
            .iter()
            .filter_map(|row| row.get("document"))
            .filter_map(decode_document)
            .collect())
    }
}

/// Build the `runQuery` request body.
fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
        "where": {
            "fieldFilter": {
                "field": { "fieldPath": query.field },
                "op": "EQUAL",
                "value": encode_value(&query.value),
            }
        },
    });

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured["orderBy"] = json!([{ "field": { "fieldPath": field }, "direction": direction }]);
    }

    json!({ "structuredQuery": structured })
}

/// Map a failed Firestore response to a [`StoreError`].
fn store_error(status: StatusCode, text: &str) -> StoreError {
    let body = parse_error_body(status, text);
    let code = match body.status.as_deref() {
        Some(name) => StoreErrorCode::from_status(name),
        None if status == StatusCode::NOT_FOUND => StoreErrorCode::NotFound,
        None if status == StatusCode::FORBIDDEN => StoreErrorCode::PermissionDenied,
        None if status == StatusCode::UNAUTHORIZED => StoreErrorCode::Unauthenticated,
        None if status.is_server_error() => StoreErrorCode::Unavailable,
        None => StoreErrorCode::Unknown,
    };
    StoreError::new(code, body.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_query_shape() {
        let query = Query::where_eq("userId", "u1").order_by("createdAt", Direction::Descending);
        let body = structured_query("orders", &query);
        let structured = &body["structuredQuery"];

        assert_eq!(structured["from"][0]["collectionId"], "orders");
        assert_eq!(structured["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(
            structured["where"]["fieldFilter"]["value"],
            json!({ "stringValue": "u1" })
        );
        assert_eq!(structured["orderBy"][0]["field"]["fieldPath"], "createdAt");
        assert_eq!(structured["orderBy"][0]["direction"], "DESCENDING");
    }

    #[test]
    fn test_unordered_query_has_no_order_by() {
        let body = structured_query("orders", &Query::where_eq("userId", "u1"));
        assert!(body["structuredQuery"].get("orderBy").is_none());
    }

    #[test]
    fn test_store_error_mapping() {
        let err = store_error(
            StatusCode::BAD_REQUEST,
            r#"[{"error":{"code":400,"message":"The query requires an index.","status":"FAILED_PRECONDITION"}}]"#,
        );
        assert_eq!(err.code, StoreErrorCode::FailedPrecondition);
        assert_eq!(err.message, "The query requires an index.");

        let err = store_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#,
        );
        assert_eq!(err.code, StoreErrorCode::PermissionDenied);

        let err = store_error(StatusCode::NOT_FOUND, "");
        assert_eq!(err.code, StoreErrorCode::NotFound);
    }
}
