//! Storage seams
//!
//! The pipeline and the authenticator only see the [`ListingStore`] and
//! [`UserStore`] traits. Calls are blocking; async callers run them on the
//! blocking thread pool.

#[cfg(test)]
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use classifieds_core::listing::{Listing, ListingId, Projection};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("query exceeded its {0:?} time limit")]
    Timeout(Duration),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("malformed record {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("document #{position}: {source}")]
    Batch {
        position: usize,
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Attach the 1-based position of the document that failed inside a batch
    pub fn at_position(self, position: usize) -> Self {
        StoreError::Batch {
            position,
            source: Box::new(self),
        }
    }
}

/// A window over the listing collection, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    pub skip: u64,
    pub limit: u64,
    pub projection: Projection,
    pub time_limit: Duration,
}

pub trait ListingStore: Send + Sync {
    /// Number of listings in the whole collection
    fn count(&self) -> Result<u64, StoreError>;

    /// Listings in `[skip, skip + limit)`, most recently inserted first
    fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>, StoreError>;

    fn find(
        &self,
        id: &ListingId,
        projection: Projection,
        time_limit: Duration,
    ) -> Result<Option<Listing>, StoreError>;

    /// Insert a document, keeping its `_id` when it carries a valid one
    fn insert(&self, document: &Value) -> Result<ListingId, StoreError>;

    /// Insert every document or none of them
    ///
    /// A failure is reported as [`StoreError::Batch`] naming the offending
    /// document.
    fn insert_all(&self, documents: &[Value]) -> Result<Vec<ListingId>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub trait UserStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;
}

/// Split a document into its identifier and the remaining fields
///
/// Documents without a usable `_id` get a freshly generated one.
pub fn split_document(document: &Value) -> (ListingId, Value) {
    let mut body = document.clone();

    let existing = body
        .as_object_mut()
        .and_then(|map| map.remove("_id"))
        .and_then(|id| id.as_str().and_then(|s| ListingId::parse(s).ok()));

    (existing.unwrap_or_else(generate_id), body)
}

/// New identifier from the current time, process randomness and a counter
pub fn generate_id() -> ListingId {
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let timestamp = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    ListingId::from_parts(timestamp, rand::random::<[u8; 5]>(), counter)
}
