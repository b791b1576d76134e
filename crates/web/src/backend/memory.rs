//! In-process backend for local development and tests.
//!
//! Implements both backend contracts against maps held in memory. Passwords
//! are hashed with Argon2id, tokens are random and never expire, and server
//! timestamps resolve to the current clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use delivery_core::{Email, Uid};

use super::auth::{AuthError, AuthGrant, Identity, IdentityProvider};
use super::document::{
    Direction, Document, DocumentStore, FieldValue, Query, Record, StoreError, StoreErrorCode,
};
use super::random_id;

/// Minimum password length, matching the hosted backend's policy.
const MIN_PASSWORD_LENGTH: usize = 6;

struct Account {
    uid: Uid,
    email: Email,
    password_hash: String,
}

type Collection = BTreeMap<String, Record>;

/// Identity provider and document store backed by process memory.
#[derive(Default)]
pub struct MemoryBackend {
    accounts: Mutex<HashMap<Email, Account>>,
    tokens: Mutex<HashMap<String, Identity>>,
    collections: Mutex<HashMap<String, Collection>>,
    next_query_failure: Mutex<Option<StoreError>>,
    document_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `query_where` call fail with `error`.
    pub fn fail_next_query(&self, error: StoreError) {
        *lock(&self.next_query_failure) = Some(error);
    }

    /// Number of document store calls made so far.
    #[must_use]
    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    /// Store a document under a chosen ID, bypassing access checks.
    pub fn seed(&self, collection: &str, id: &str, record: Record) {
        lock(&self.collections)
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), resolve_server_timestamps(record));
    }

    fn issue_grant(&self, identity: Identity) -> AuthGrant {
        let id_token = random_id(32);
        lock(&self.tokens).insert(id_token.clone(), identity.clone());
        AuthGrant {
            identity,
            id_token: SecretString::from(id_token),
            refresh_token: SecretString::from(random_id(32)),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn caller(&self, token: &SecretString) -> Result<Identity, StoreError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.tokens)
            .get(token.expose_secret())
            .cloned()
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::Unauthenticated,
                    "Request is missing valid authentication credentials",
                )
            })
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn create_identity(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError> {
        let password = password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let password_hash = hash_password(password)?;
        let identity = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(email) {
                return Err(AuthError::UserAlreadyExists);
            }
            let uid = Uid::new(random_id(28));
            accounts.insert(
                email.clone(),
                Account {
                    uid: uid.clone(),
                    email: email.clone(),
                    password_hash,
                },
            );
            Identity {
                uid,
                email: email.clone(),
            }
        };

        tracing::info!(uid = %identity.uid, "account created");
        Ok(self.issue_grant(identity))
    }

    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, AuthError> {
        let (identity, password_hash) = {
            let accounts = lock(&self.accounts);
            let account = accounts.get(email).ok_or(AuthError::UserNotFound)?;
            (
                Identity {
                    uid: account.uid.clone(),
                    email: account.email.clone(),
                },
                account.password_hash.clone(),
            )
        };

        verify_password(password.expose_secret(), &password_hash)?;
        Ok(self.issue_grant(identity))
    }

    async fn refresh(&self, grant: &AuthGrant) -> Result<AuthGrant, AuthError> {
        let known = lock(&self.tokens).remove(grant.id_token.expose_secret());
        match known {
            Some(identity) => Ok(self.issue_grant(identity)),
            None => Err(AuthError::SessionExpired("INVALID_REFRESH_TOKEN".into())),
        }
    }

    async fn end_session(&self, grant: &AuthGrant) -> Result<(), AuthError> {
        lock(&self.tokens).remove(grant.id_token.expose_secret());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn insert(
        &self,
        token: &SecretString,
        collection: &str,
        record: Record,
    ) -> Result<String, StoreError> {
        self.caller(token)?;
        let id = random_id(20);
        lock(&self.collections)
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), resolve_server_timestamps(record));
        Ok(id)
    }

    async fn get_by_id(
        &self,
        token: &SecretString,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.caller(token)?;
        let collections = lock(&self.collections);
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_owned(),
                fields: fields.clone(),
            }))
    }

    async fn query_where(
        &self,
        token: &SecretString,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        self.caller(token)?;
        if let Some(err) = lock(&self.next_query_failure).take() {
            return Err(err);
        }

        let collections = lock(&self.collections);
        let mut matches: Vec<Document> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|(_, fields)| fields.get(&query.field) == Some(&query.value))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some((field, direction)) = &query.order_by {
            // Documents missing the sort field are excluded, as the hosted store does.
            matches.retain(|doc| doc.fields.contains_key(field));
            matches.sort_by(|a, b| {
                let ord = a.fields[field].sort_cmp(&b.fields[field]);
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        Ok(matches)
    }
}

fn resolve_server_timestamps(record: Record) -> Record {
    let now = Utc::now();
    record
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
                FieldValue::Map(inner) => FieldValue::Map(resolve_server_timestamps(inner)),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let backend = MemoryBackend::new();
        let created = backend
            .create_identity(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();
        let signed_in = backend
            .authenticate(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();
        assert_eq!(created.identity, signed_in.identity);
    }

    #[tokio::test]
    async fn test_signup_rejections() {
        let backend = MemoryBackend::new();
        let short = backend
            .create_identity(&email("ama@example.com"), &pw("12345"))
            .await
            .unwrap_err();
        assert!(matches!(short, AuthError::WeakPassword(_)));

        backend
            .create_identity(&email("ama@example.com"), &pw("123456"))
            .await
            .unwrap();
        let duplicate = backend
            .create_identity(&email("ama@example.com"), &pw("123456"))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let backend = MemoryBackend::new();
        backend
            .create_identity(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();

        let wrong = backend
            .authenticate(&email("ama@example.com"), &pw("secret2"))
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));

        let missing = backend
            .authenticate(&email("kofi@example.com"), &pw("secret1"))
            .await
            .unwrap_err();
        assert!(matches!(missing, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn test_documents_require_a_known_token() {
        let backend = MemoryBackend::new();
        let err = backend
            .insert(&pw("forged"), "orders", Record::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::Unauthenticated);
        assert_eq!(backend.document_calls(), 1);
    }

    #[tokio::test]
    async fn test_insert_resolves_server_timestamps() {
        let backend = MemoryBackend::new();
        let grant = backend
            .create_identity(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();

        let mut record = Record::new();
        record.insert("createdAt".into(), FieldValue::ServerTimestamp);
        let id = backend
            .insert(&grant.id_token, "orders", record)
            .await
            .unwrap();
        assert_eq!(id.len(), 20);

        let doc = backend
            .get_by_id(&grant.id_token, "orders", &id)
            .await
            .unwrap()
            .unwrap();
        assert!(doc.fields["createdAt"].as_timestamp().is_some());
        assert!(
            backend
                .get_by_id(&grant.id_token, "orders", "missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let backend = MemoryBackend::new();
        let grant = backend
            .create_identity(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();

        for (id, owner, rank) in [("a", "u1", 1), ("b", "u2", 2), ("c", "u1", 3)] {
            let mut record = Record::new();
            record.insert("userId".into(), owner.into());
            record.insert("rank".into(), FieldValue::Integer(rank));
            backend.seed("orders", id, record);
        }

        let query = Query::where_eq("userId", "u1").order_by("rank", Direction::Descending);
        let docs = backend
            .query_where(&grant.id_token, "orders", &query)
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
    }

    #[tokio::test]
    async fn test_injected_query_failure_fires_once() {
        let backend = MemoryBackend::new();
        let grant = backend
            .create_identity(&email("ama@example.com"), &pw("secret1"))
            .await
            .unwrap();
        backend.fail_next_query(StoreError::new(
            StoreErrorCode::FailedPrecondition,
            "The query requires an index",
        ));

        let query = Query::where_eq("userId", "u1");
        let err = backend
            .query_where(&grant.id_token, "orders", &query)
            .await
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::FailedPrecondition);
        assert!(
            backend
                .query_where(&grant.id_token, "orders", &query)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
