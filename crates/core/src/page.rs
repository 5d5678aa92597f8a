//! Dashboard page assembly

use serde::Serialize;

use crate::listing::Listing;
use crate::locale::Labels;
use crate::normalize::{normalize_listing, DisplayRecord, View};
use crate::pagination::{pagination_info, PageBounds, PaginationInfo, DEFAULT_PER_PAGE};

/// Complete dashboard output: display records plus pagination metadata
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ListingPage {
    pub data: Vec<DisplayRecord>,
    pub total_items: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

impl ListingPage {
    /// The page rendered when the collection could not be read
    ///
    /// Reports a single empty page so pagination controls stay well-formed.
    pub fn degraded() -> Self {
        Self {
            data: Vec::new(),
            total_items: 0,
            current_page: 1,
            page_size: DEFAULT_PER_PAGE,
            total_pages: 1,
            next_page_url: None,
            prev_page_url: None,
        }
    }
}

/// Transform a window of listings into a dashboard page
///
/// `total_items` is the size of the whole collection, not of the window.
pub fn transform_listings(
    listings: Vec<Listing>,
    bounds: PageBounds,
    total_items: u64,
    labels: &Labels,
) -> ListingPage {
    let data: Vec<DisplayRecord> = listings
        .into_iter()
        .map(|listing| normalize_listing(listing, View::Dashboard, labels))
        .collect();

    let PaginationInfo {
        current_page,
        total_pages,
        total_items,
        page_size,
        next_page_url,
        prev_page_url,
    } = pagination_info(bounds, total_items);

    ListingPage {
        data,
        total_items,
        current_page,
        page_size,
        total_pages,
        next_page_url,
        prev_page_url,
    }
}
