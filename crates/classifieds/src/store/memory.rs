//! In-memory store for tests, with injectable failures

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use classifieds_core::listing::{Listing, ListingId, Projection};
use serde_json::Value;

use super::{split_document, ListingQuery, ListingStore, StoreError, UserRecord, UserStore};

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Every listing call fails with [`StoreError::Timeout`]
    Timeout,
    /// Every listing call fails with [`StoreError::Unavailable`]
    Unavailable,
    /// Listing queries block for the given time before answering
    Stall(Duration),
}

#[derive(Default)]
pub struct MemoryStore {
    listings: Mutex<Vec<(ListingId, Value)>>,
    users: Mutex<Vec<UserRecord>>,
    failure: Mutex<Option<Failure>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    fn check(&self, time_limit: Duration) -> Result<(), StoreError> {
        let failure = *self.failure.lock().unwrap_or_else(PoisonError::into_inner);

        match failure {
            None => Ok(()),
            Some(Failure::Timeout) => Err(StoreError::Timeout(time_limit)),
            Some(Failure::Unavailable) => {
                Err(StoreError::Unavailable("connection refused".to_string()))
            }
            Some(Failure::Stall(delay)) => {
                std::thread::sleep(delay);
                Ok(())
            }
        }
    }
}

impl ListingStore for MemoryStore {
    fn count(&self) -> Result<u64, StoreError> {
        self.check(Duration::ZERO)?;
        let listings = self.listings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(listings.len() as u64)
    }

    fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>, StoreError> {
        self.check(query.time_limit)?;
        let listings = self.listings.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(listings
            .iter()
            .rev()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .map(|(id, doc)| Listing::from_document(id.clone(), doc, query.projection))
            .collect())
    }

    fn find(
        &self,
        id: &ListingId,
        projection: Projection,
        time_limit: Duration,
    ) -> Result<Option<Listing>, StoreError> {
        self.check(time_limit)?;
        let listings = self.listings.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(listings
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(id, doc)| Listing::from_document(id.clone(), doc, projection)))
    }

    fn insert(&self, document: &Value) -> Result<ListingId, StoreError> {
        let (id, body) = split_document(document);
        let mut listings = self.listings.lock().unwrap_or_else(PoisonError::into_inner);

        if listings.iter().any(|(existing, _)| *existing == id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }

        listings.push((id.clone(), body));
        Ok(id)
    }

    fn insert_all(&self, documents: &[Value]) -> Result<Vec<ListingId>, StoreError> {
        let mut listings = self.listings.lock().unwrap_or_else(PoisonError::into_inner);
        let mut staged: Vec<(ListingId, Value)> = Vec::with_capacity(documents.len());

        for (index, document) in documents.iter().enumerate() {
            let (id, body) = split_document(document);
            let taken = listings
                .iter()
                .chain(staged.iter())
                .any(|(existing, _)| *existing == id);
            if taken {
                return Err(StoreError::Duplicate(id.to_string()).at_position(index + 1));
            }
            staged.push((id, body));
        }

        let ids = staged.iter().map(|(id, _)| id.clone()).collect();
        listings.extend(staged);
        Ok(ids)
    }
}

impl UserStore for MemoryStore {
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);

        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(user.username.clone()));
        }

        users.push(user.clone());
        Ok(())
    }
}
