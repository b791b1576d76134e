//! Order placement and retrieval.
//!
//! Every operation acts as the signed-in caller: the caller's ID token goes
//! with each document store call, and reads re-check ownership before an
//! order is handed to a page.

mod error;
mod record;

use std::sync::Arc;

use secrecy::SecretString;
use tracing::instrument;

use delivery_core::{Order, OrderDraft, OrderId};

pub use error::OrderError;
pub use record::{ORDERS, order_from_document, order_record};

use crate::backend::{AuthClient, AuthError, Direction, DocumentStore, Identity, Query};
use crate::error::add_breadcrumb;

/// The signed-in user an operation runs as.
#[derive(Clone)]
pub struct Caller {
    pub identity: Identity,
    /// Supplies the ID token for document store calls.
    pub client: Arc<AuthClient>,
}

impl Caller {
    async fn token(&self) -> Result<SecretString, OrderError> {
        match self.client.access_token().await {
            Ok(token) => Ok(token),
            Err(AuthError::NotSignedIn) => Err(OrderError::NotAuthenticated),
            Err(e) => Err(e.into()),
        }
    }
}

/// Order operations over the document store.
#[derive(Clone)]
pub struct OrderService {
    documents: Arc<dyn DocumentStore>,
}

impl OrderService {
    /// Create a service over `documents`.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Place a new order owned by the caller.
    ///
    /// The order is stamped with the caller's ID and email, status
    /// `pending`, and server-side creation and update times.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` without touching the store when
    /// there is no caller, or the store's rejection.
    #[instrument(skip_all, fields(uid))]
    pub async fn submit(
        &self,
        caller: Option<&Caller>,
        draft: &OrderDraft,
    ) -> Result<OrderId, OrderError> {
        let caller = caller.ok_or(OrderError::NotAuthenticated)?;
        tracing::Span::current().record("uid", tracing::field::display(&caller.identity.uid));

        let token = caller.token().await?;
        let record = order_record(&caller.identity, draft);
        let id = OrderId::new(self.documents.insert(&token, ORDERS, record).await?);

        tracing::info!(order_id = %id, region = %draft.region, "order placed");
        add_breadcrumb("order", "Order placed", Some(&[("order_id", id.as_str())]));
        Ok(id)
    }

    /// Every order the caller placed, newest first.
    ///
    /// Documents that cannot be read as orders are skipped and logged.
    ///
    /// # Errors
    ///
    /// Returns the store's rejection, e.g. `failed-precondition` while the
    /// backing index is still building.
    #[instrument(skip_all, fields(uid = %caller.identity.uid))]
    pub async fn list_for(&self, caller: &Caller) -> Result<Vec<Order>, OrderError> {
        let token = caller.token().await?;
        let query = Query::where_eq(record::OWNER_FIELD, caller.identity.uid.as_str())
            .order_by(record::CREATED_FIELD, Direction::Descending);

        let documents = self.documents.query_where(&token, ORDERS, &query).await?;
        let orders = documents
            .iter()
            .filter_map(|doc| match order_from_document(doc) {
                Ok(order) if order.is_owned_by(&caller.identity.uid) => Some(order),
                Ok(order) => {
                    tracing::warn!(order_id = %order.id, "query returned another user's order");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable order");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = orders.len(), "orders listed");
        Ok(orders)
    }

    /// One order, if the caller owns it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists and
    /// `OrderError::PermissionDenied` if it belongs to someone else.
    #[instrument(skip_all, fields(uid = %caller.identity.uid, order_id = %id))]
    pub async fn get_for(&self, caller: &Caller, id: &OrderId) -> Result<Order, OrderError> {
        let token = caller.token().await?;
        let doc = self
            .documents
            .get_by_id(&token, ORDERS, id.as_str())
            .await?
            .ok_or(OrderError::NotFound)?;

        let order = order_from_document(&doc)?;
        if !order.is_owned_by(&caller.identity.uid) {
            tracing::warn!(owner = %order.owner_id, "order read by non-owner refused");
            return Err(OrderError::PermissionDenied);
        }
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use delivery_core::{DeliveryType, Email, OrderStatus, PackageSize, Region};

    use super::*;
    use crate::backend::{MemoryBackend, StoreError, StoreErrorCode};

    async fn caller(backend: &Arc<MemoryBackend>, email: &str) -> Caller {
        let client = Arc::new(AuthClient::new(backend.clone()));
        let identity = client
            .create_identity(&Email::parse(email).unwrap(), &SecretString::from("secret1"))
            .await
            .unwrap();
        Caller { identity, client }
    }

    fn sample_draft() -> OrderDraft {
        let mut draft = OrderDraft::with_region(Region::Yaounde);
        draft.pickup_address.address = "Avenue Kennedy".into();
        draft.pickup_address.phone = "+237 650 000 001".into();
        draft.delivery_address.address = "Bastos".into();
        draft.delivery_address.landmark = "Opposite the pharmacy".into();
        draft.package_details.size = PackageSize::Medium;
        draft.package_details.description = "Two boxes of books".into();
        draft.package_details.value = Some(Decimal::from_str("25000").unwrap());
        draft.delivery_type = DeliveryType::Express;
        draft.preferred_delivery_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        draft
    }

    #[tokio::test]
    async fn test_submit_without_caller_skips_store() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());

        let err = service.submit(None, &sample_draft()).await.unwrap_err();
        assert!(matches!(err, OrderError::NotAuthenticated));
        assert_eq!(backend.document_calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_then_get_round_trip() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;
        let draft = sample_draft();

        let id = service.submit(Some(&ama), &draft).await.unwrap();
        let order = service.get_for(&ama, &id).await.unwrap();

        assert_eq!(order.id, id);
        assert_eq!(order.owner_id, ama.identity.uid);
        assert_eq!(order.owner_email, "ama@example.com");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.pickup_address, draft.pickup_address);
        assert_eq!(order.delivery_address, draft.delivery_address);
        assert_eq!(order.package_details, draft.package_details);
        assert_eq!(order.delivery_type, draft.delivery_type);
        assert_eq!(order.preferred_delivery_date, draft.preferred_delivery_date);
        assert_eq!(order.region, Region::Yaounde);
        assert!(order.created_at.is_some());
        assert_eq!(order.created_at, order.updated_at);
    }

    #[tokio::test]
    async fn test_get_refuses_other_owner() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;
        let kofi = caller(&backend, "kofi@example.com").await;

        let id = service.submit(Some(&ama), &sample_draft()).await.unwrap();
        let err = service.get_for(&kofi, &id).await.unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;

        let err = service
            .get_for(&ama, &OrderId::new("does-not-exist"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    #[tokio::test]
    async fn test_list_only_own_orders_newest_first() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;
        let kofi = caller(&backend, "kofi@example.com").await;

        assert!(service.list_for(&ama).await.unwrap().is_empty());

        let first = service.submit(Some(&ama), &sample_draft()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = service.submit(Some(&ama), &sample_draft()).await.unwrap();
        service.submit(Some(&kofi), &sample_draft()).await.unwrap();

        let ids: Vec<_> = service
            .list_for(&ama)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, [second, first]);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_documents() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;

        let mut broken = order_record(&ama.identity, &OrderDraft::default());
        broken.insert("region".into(), "atlantis".into());
        backend.seed(ORDERS, "broken", broken);
        service.submit(Some(&ama), &sample_draft()).await.unwrap();

        let orders = service.list_for(&ama).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_ne!(orders[0].id.as_str(), "broken");
    }

    #[tokio::test]
    async fn test_list_surfaces_precondition_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;
        backend.fail_next_query(StoreError::new(
            StoreErrorCode::FailedPrecondition,
            "The query requires an index",
        ));

        let err = service.list_for(&ama).await.unwrap_err();
        assert_eq!(
            err.list_message(),
            "Please wait a few minutes and try again. The database is updating."
        );
    }

    #[tokio::test]
    async fn test_signed_out_caller_is_not_authenticated() {
        let backend = Arc::new(MemoryBackend::new());
        let service = OrderService::new(backend.clone());
        let ama = caller(&backend, "ama@example.com").await;
        ama.client.end_session().await.unwrap();

        let err = service.list_for(&ama).await.unwrap_err();
        assert!(matches!(err, OrderError::NotAuthenticated));
        assert_eq!(backend.document_calls(), 0);
    }
}
