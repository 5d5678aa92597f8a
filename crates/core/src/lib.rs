//! Core library for classifieds
//!
//! This crate implements the **Functional Core** of the classifieds application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The classifieds project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`classifieds_core`** (this crate): Pure transformation functions with zero I/O
//! - **`classifieds`**: Storage, sessions, the web server and the CLI (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Never panics on user data**: malformed listings degrade to defaults and sentinels
//!
//! # Module Organization
//!
//! - [`pagination`]: Clamping of requested page parameters and page-count math
//! - [`listing`]: Listing identifiers, stored documents and field projections
//! - [`normalize`]: Conversion of raw listings into display records
//! - [`page`]: Assembly of a dashboard page, including the degraded fallback
//! - [`locale`]: Display labels and user-facing messages
//! - [`credentials`]: Username validation and salted password hashes
//! - [`assets`]: Image gallery filtering for the static directory
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use classifieds_core::listing::{Listing, ListingId, Projection};
//! use classifieds_core::locale::Locale;
//! use classifieds_core::page::transform_listings;
//! use classifieds_core::pagination::PageBounds;
//!
//! let bounds = PageBounds::resolve(Some("3"), Some("10"));
//! assert_eq!(bounds.skip(), 20);
//!
//! let id = ListingId::parse("65a4f1c2e13b5a0012345678").unwrap();
//! let listing = Listing::from_document(id, &serde_json::json!({"title": "Bike"}), Projection::Dashboard);
//!
//! let page = transform_listings(vec![listing], bounds, 21, &Locale::En.labels());
//! assert_eq!(page.total_pages, 3);
//! ```

pub mod assets;
pub mod credentials;
pub mod listing;
pub mod locale;
pub mod normalize;
pub mod page;
pub mod pagination;
