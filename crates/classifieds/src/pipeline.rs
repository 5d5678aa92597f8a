//! Listing query pipeline
//!
//! Resolves page bounds, reads a window of the collection off the async
//! runtime and normalizes the result. Storage failures never escape: the
//! dashboard degrades to an empty page and the detail view reports a failed
//! outcome, both after logging a diagnostic.

use std::sync::Arc;
use std::time::Duration;

use classifieds_core::listing::{Listing, ListingId, Projection};
use classifieds_core::locale::Labels;
use classifieds_core::normalize::{normalize_listing, DisplayRecord, View};
use classifieds_core::page::{transform_listings, ListingPage};
use classifieds_core::pagination::PageBounds;

use crate::store::{ListingQuery, ListingStore, StoreError};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DETAIL_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time granted to a store before the pipeline stops waiting on it
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub query_timeout: Duration,
    pub detail_timeout: Duration,
    pub labels: Labels,
}

/// Dashboard result; `degraded` is set when the collection could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub page: ListingPage,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Found(DisplayRecord),
    /// The identifier was rejected before querying
    InvalidId,
    NotFound,
    Failed,
}

pub struct ListingPipeline {
    store: Arc<dyn ListingStore>,
    settings: PipelineSettings,
}

impl ListingPipeline {
    pub fn new(store: Arc<dyn ListingStore>, settings: PipelineSettings) -> Self {
        Self { store, settings }
    }

    /// Build the dashboard page for raw `page`/`per_page` parameters
    pub async fn dashboard(&self, page: Option<&str>, per_page: Option<&str>) -> Dashboard {
        let bounds = PageBounds::resolve(page, per_page);

        match self.fetch_window(bounds).await {
            Ok((total_items, listings)) => Dashboard {
                page: transform_listings(listings, bounds, total_items, &self.settings.labels),
                degraded: false,
            },
            Err(e) => {
                log::error!(
                    "Dashboard query failed (page {}, per_page {}): {e}",
                    bounds.page,
                    bounds.per_page
                );
                Dashboard {
                    page: ListingPage::degraded(),
                    degraded: true,
                }
            }
        }
    }

    /// Total count plus the listings in the window described by `bounds`
    pub async fn fetch_window(&self, bounds: PageBounds) -> Result<(u64, Vec<Listing>), StoreError> {
        let store = Arc::clone(&self.store);
        let query = ListingQuery {
            skip: bounds.skip(),
            limit: bounds.per_page,
            projection: Projection::Dashboard,
            time_limit: self.settings.query_timeout,
        };

        run_blocking(self.settings.query_timeout, move || {
            let total_items = store.count()?;
            let listings = store.query(&query)?;
            Ok((total_items, listings))
        })
        .await
    }

    /// Look up a single listing for the detail view
    pub async fn detail(&self, raw_id: &str) -> DetailOutcome {
        let id = match ListingId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                log::info!("Rejected detail lookup for {raw_id:?}: {e}");
                return DetailOutcome::InvalidId;
            }
        };

        let store = Arc::clone(&self.store);
        let time_limit = self.settings.detail_timeout;
        let lookup_id = id.clone();

        let result = run_blocking(time_limit, move || {
            store.find(&lookup_id, Projection::Detail, time_limit)
        })
        .await;

        match result {
            Ok(Some(listing)) => DetailOutcome::Found(normalize_listing(
                listing,
                View::Detail,
                &self.settings.labels,
            )),
            Ok(None) => DetailOutcome::NotFound,
            Err(e) => {
                log::error!("Detail query for {id} failed: {e}");
                DetailOutcome::Failed
            }
        }
    }
}

/// Run a blocking store call, giving up shortly after its time limit
///
/// Stores enforce `time_limit` themselves; the extra grace period only covers
/// stores that fail to honor it.
async fn run_blocking<T, F>(time_limit: Duration, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);

    match tokio::time::timeout(time_limit + TIMEOUT_GRACE, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StoreError::Unavailable(format!("store task failed: {e}"))),
        Err(_) => Err(StoreError::Timeout(time_limit)),
    }
}
