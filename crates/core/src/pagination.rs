//! Pagination bounds and metadata
//!
//! Pure functions that turn untrusted `page`/`per_page` query parameters into a
//! safe window over the listing collection, and derive the page count shown to
//! the user. Out-of-range input is clamped, never rejected.

use serde::Serialize;
use std::num::IntErrorKind;

pub const DEFAULT_PAGE: u64 = 1;
pub const MAX_PAGE: u64 = 1000;
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// A resolved page request, always within `1..=MAX_PAGE` and `1..=MAX_PER_PAGE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageBounds {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageBounds {
    /// Resolve raw query parameters into clamped bounds
    ///
    /// Missing or non-numeric values fall back to the defaults. Numeric values
    /// outside the valid range (including ones too large to represent) are
    /// clamped to the nearest bound.
    pub fn resolve(page: Option<&str>, per_page: Option<&str>) -> Self {
        Self {
            page: parse_param(page, DEFAULT_PAGE, MAX_PAGE),
            per_page: parse_param(per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE),
        }
    }

    /// Number of records preceding this page
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

fn parse_param(raw: Option<&str>, default: u64, max: u64) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };

    match raw.parse::<i64>() {
        Ok(value) => value.clamp(1, max as i64) as u64,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => max,
            IntErrorKind::NegOverflow => 1,
            _ => default,
        },
    }
}

/// Number of pages needed to show `total_items` at `per_page` items each
pub fn total_pages(total_items: u64, per_page: u64) -> u64 {
    total_items.div_ceil(per_page.max(1))
}

/// Pagination metadata for a dashboard page
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub page_size: u64,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

/// Build pagination metadata with navigation links for the dashboard
pub fn pagination_info(bounds: PageBounds, total_items: u64) -> PaginationInfo {
    let total_pages = total_pages(total_items, bounds.per_page);

    let next_page = if bounds.page < total_pages {
        Some(dashboard_url(bounds.page + 1, bounds.per_page))
    } else {
        None
    };

    let prev_page = if bounds.page > 1 {
        Some(dashboard_url(bounds.page - 1, bounds.per_page))
    } else {
        None
    };

    PaginationInfo {
        current_page: bounds.page,
        total_pages,
        total_items,
        page_size: bounds.per_page,
        next_page_url: next_page,
        prev_page_url: prev_page,
    }
}

fn dashboard_url(page: u64, per_page: u64) -> String {
    format!("/dashboard?page={page}&per_page={per_page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_when_missing() {
        let bounds = PageBounds::resolve(None, None);
        assert_eq!(bounds, PageBounds { page: 1, per_page: 10 });
    }

    #[test]
    fn test_resolve_defaults_when_not_numeric() {
        let bounds = PageBounds::resolve(Some("abc"), Some("3.5"));
        assert_eq!(bounds.page, 1);
        assert_eq!(bounds.per_page, 10);

        let bounds = PageBounds::resolve(Some(""), Some("   "));
        assert_eq!(bounds, PageBounds::default());
    }

    #[test]
    fn test_resolve_clamps_low_values() {
        for raw in ["0", "-1", "-500"] {
            let bounds = PageBounds::resolve(Some(raw), Some(raw));
            assert_eq!(bounds.page, 1, "page for {raw}");
            assert_eq!(bounds.per_page, 1, "per_page for {raw}");
        }
    }

    #[test]
    fn test_resolve_clamps_high_values() {
        let bounds = PageBounds::resolve(Some("1001"), Some("101"));
        assert_eq!(bounds.page, 1000);
        assert_eq!(bounds.per_page, 100);
    }

    #[test]
    fn test_resolve_clamps_overflowing_values() {
        let bounds = PageBounds::resolve(
            Some("99999999999999999999999"),
            Some("-99999999999999999999999"),
        );
        assert_eq!(bounds.page, 1000);
        assert_eq!(bounds.per_page, 1);
    }

    #[test]
    fn test_resolve_accepts_surrounding_whitespace_and_sign() {
        let bounds = PageBounds::resolve(Some(" 7 "), Some("+25"));
        assert_eq!(bounds.page, 7);
        assert_eq!(bounds.per_page, 25);
    }

    #[test]
    fn test_skip() {
        assert_eq!(PageBounds::resolve(Some("3"), Some("10")).skip(), 20);
        assert_eq!(PageBounds::resolve(Some("1"), Some("50")).skip(), 0);
        assert_eq!(PageBounds::resolve(Some("1000"), Some("100")).skip(), 99_900);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 10), 10);
        assert_eq!(total_pages(7, 1), 7);
    }

    #[test]
    fn test_total_pages_matches_integer_ceiling() {
        for total_items in 0..250u64 {
            for per_page in 1..=MAX_PER_PAGE {
                assert_eq!(
                    total_pages(total_items, per_page),
                    (total_items + per_page - 1) / per_page
                );
            }
        }
    }

    #[test]
    fn test_pagination_info_first_page() {
        let info = pagination_info(PageBounds { page: 1, per_page: 10 }, 50);

        assert_eq!(info.current_page, 1);
        assert_eq!(info.total_pages, 5);
        assert_eq!(info.total_items, 50);
        assert_eq!(info.page_size, 10);
        assert!(info.prev_page_url.is_none());
        assert_eq!(
            info.next_page_url.as_deref(),
            Some("/dashboard?page=2&per_page=10")
        );
    }

    #[test]
    fn test_pagination_info_last_page() {
        let info = pagination_info(PageBounds { page: 5, per_page: 10 }, 50);

        assert!(info.next_page_url.is_none());
        assert_eq!(
            info.prev_page_url.as_deref(),
            Some("/dashboard?page=4&per_page=10")
        );
    }

    #[test]
    fn test_pagination_info_past_the_end_keeps_requested_page() {
        let info = pagination_info(PageBounds { page: 9, per_page: 10 }, 30);

        assert_eq!(info.current_page, 9);
        assert_eq!(info.total_pages, 3);
        assert!(info.next_page_url.is_none());
        assert!(info.prev_page_url.is_some());
    }
}
