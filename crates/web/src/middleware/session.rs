//! Session middleware configuration.
//!
//! The cookie session only carries a random client key; the signed-in
//! identity itself lives in the [`SessionHub`](crate::session::SessionHub)
//! entry for that key. Cookie records are kept in [`SessionRecords`], which
//! drops each record once its expiry date passes.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry as CacheExpiry;
use moka::future::Cache;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::WebConfig;
use crate::session::MAX_SESSIONS;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "delivery_session";

/// Session expiry time in seconds (7 days).
pub const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session keys.
pub mod keys {
    /// Key for the client key that selects this browser's session store.
    pub const CLIENT_KEY: &str = "client_key";
}

/// In-process cookie session records.
///
/// Each record is evicted when its `expiry_date` passes, so abandoned
/// sessions do not accumulate.
#[derive(Clone)]
pub struct SessionRecords {
    records: Cache<Id, Record>,
}

/// Cache expiry policy: a record lives until its own expiry date.
struct UntilExpiryDate;

impl CacheExpiry<Id, Record> for UntilExpiryDate {
    fn expire_after_create(&self, _id: &Id, record: &Record, _at: Instant) -> Option<Duration> {
        Some(time_left(record))
    }

    fn expire_after_update(
        &self,
        _id: &Id,
        record: &Record,
        _at: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Some(time_left(record))
    }
}

fn time_left(record: &Record) -> Duration {
    (record.expiry_date - OffsetDateTime::now_utc())
        .try_into()
        .unwrap_or(Duration::ZERO)
}

impl SessionRecords {
    #[must_use]
    pub fn new() -> Self {
        let records = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .expire_after(UntilExpiryDate)
            .build();
        Self { records }
    }

    /// Number of live records.
    pub async fn live_count(&self) -> u64 {
        self.records.run_pending_tasks().await;
        self.records.entry_count()
    }
}

impl Default for SessionRecords {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecords")
            .field("entries", &self.records.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for SessionRecords {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .get(id)
            .await
            .filter(|record| record.expiry_date > now))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.invalidate(id).await;
        Ok(())
    }
}

/// Create the session layer over `records`.
#[must_use]
pub fn create_session_layer(
    config: &WebConfig,
    records: SessionRecords,
) -> SessionManagerLayer<SessionRecords> {
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(records)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::Duration as CookieDuration;

    use super::*;

    fn record(expires_in: CookieDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let records = SessionRecords::new();
        let mut rec = record(CookieDuration::hours(1));
        records.create(&mut rec).await.unwrap();

        assert!(records.load(&rec.id).await.unwrap().is_some());
        assert_eq!(records.live_count().await, 1);

        records.delete(&rec.id).await.unwrap();
        assert!(records.load(&rec.id).await.unwrap().is_none());
        assert_eq!(records.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_expired_records_are_dropped() {
        let records = SessionRecords::new();
        let mut stale = record(CookieDuration::seconds(-5));
        records.create(&mut stale).await.unwrap();
        let mut fresh = record(CookieDuration::hours(1));
        records.create(&mut fresh).await.unwrap();

        assert!(records.load(&stale.id).await.unwrap().is_none());
        assert_eq!(records.live_count().await, 1);
    }
}
