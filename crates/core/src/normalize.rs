//! Listing normalization
//!
//! Turns a raw [`Listing`] into a [`DisplayRecord`]: missing fields get their
//! default labels, long text is cut to a fixed number of characters and the
//! `date` field gets a formatted companion, `date_formatted`.
//!
//! Normalization never fails. Date formatting reports a [`DateParseError`]
//! which the normalizer replaces with the view's sentinel label.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value;

use crate::listing::{DateValue, Listing, Projection};
use crate::locale::Labels;

pub const TITLE_MAX_CHARS: usize = 100;
pub const CATEGORY_MAX_CHARS: usize = 100;
pub const LOCATION_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// The page a listing is displayed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Detail,
}

impl View {
    pub fn date_format(self) -> &'static str {
        match self {
            View::Dashboard => "%d/%m/%Y",
            View::Detail => "%d/%m/%Y %H:%M",
        }
    }

    /// Sentinel shown when a present `date` cannot be formatted
    pub fn date_sentinel(self, labels: &Labels) -> &'static str {
        match self {
            View::Dashboard => labels.invalid_date,
            View::Detail => labels.no_date,
        }
    }

    pub fn projection(self) -> Projection {
        match self {
            View::Dashboard => Projection::Dashboard,
            View::Detail => Projection::Detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    #[error("not an ISO-8601 date: {0:?}")]
    InvalidIso(String),

    #[error("unsupported date value: {0}")]
    Unsupported(String),
}

/// A listing ready to be rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    pub id: String,
    pub title: Value,
    pub category: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_formatted: Option<String>,
}

/// Keep the first `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate a value if it is a string; other values pass through untouched
fn truncate_value(value: Value, max_chars: usize) -> Value {
    match value {
        Value::String(text) => Value::String(truncate_chars(&text, max_chars).to_string()),
        other => other,
    }
}

/// Parse an ISO-8601 timestamp into its wall-clock time
///
/// Accepts dates, date-times with optional seconds and fractional seconds,
/// `T` or space separators and an optional UTC offset. A trailing `Z` is read
/// as `+00:00`. The result keeps the wall-clock time of the offset it was
/// written in.
pub fn parse_iso_datetime(input: &str) -> Result<NaiveDateTime, DateParseError> {
    let text = input.trim();
    let normalized = match text.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => text.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Ok(dt.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(DateParseError::InvalidIso(input.to_string()))
}

/// Format a stored date for a view
pub fn format_date(date: &DateValue, view: View) -> Result<String, DateParseError> {
    let wall_clock = match date {
        DateValue::Text(text) => parse_iso_datetime(text)?,
        DateValue::Timestamp(ts) => ts.naive_local(),
        DateValue::Other(value) => return Err(DateParseError::Unsupported(value.to_string())),
    };

    Ok(wall_clock.format(view.date_format()).to_string())
}

/// Normalize a raw listing into a display record for `view`
pub fn normalize_listing(listing: Listing, view: View, labels: &Labels) -> DisplayRecord {
    let title = listing
        .title
        .unwrap_or_else(|| Value::String(labels.untitled.to_string()));
    let category = listing
        .category
        .unwrap_or_else(|| Value::String(labels.general.to_string()));

    let date_formatted = listing.date.as_ref().map(|date| {
        format_date(date, view).unwrap_or_else(|_| view.date_sentinel(labels).to_string())
    });

    match view {
        View::Dashboard => DisplayRecord {
            id: listing.id.to_string(),
            title: truncate_value(title, TITLE_MAX_CHARS),
            category: truncate_value(category, CATEGORY_MAX_CHARS),
            price: listing.price,
            location: listing
                .location
                .map(|location| truncate_value(location, LOCATION_MAX_CHARS)),
            description: None,
            images: None,
            date: listing.date,
            date_formatted,
        },
        View::Detail => DisplayRecord {
            id: listing.id.to_string(),
            title: truncate_value(title, TITLE_MAX_CHARS),
            category,
            price: listing.price,
            location: listing.location,
            description: listing
                .description
                .map(|description| truncate_value(description, DESCRIPTION_MAX_CHARS)),
            images: listing.images,
            date: listing.date,
            date_formatted,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingId;
    use crate::locale::Locale;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn listing() -> Listing {
        Listing::bare(ListingId::parse("65a4f1c2e13b5a0012345678").unwrap())
    }

    fn labels() -> Labels {
        Locale::En.labels()
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters_not_bytes() {
        let text = "ñandú".repeat(30);
        let truncated = truncate_chars(&text, 100);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.len() > 100);
    }

    #[test]
    fn test_parse_iso_utc_suffix() {
        let dt = parse_iso_datetime("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 10:30:00");
    }

    #[test]
    fn test_parse_iso_keeps_wall_clock_of_offset() {
        let dt = parse_iso_datetime("2024-01-15T23:45:00-03:00").unwrap();
        assert_eq!(dt.format("%d/%m/%Y %H:%M").to_string(), "15/01/2024 23:45");
    }

    #[test]
    fn test_parse_iso_variants() {
        for input in [
            "2024-01-15",
            "2024-01-15T10:30",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30:00.123456",
            "2024-01-15T10:30:00.5+00:00",
            "2024-01-15T10:30:00+0000",
            "2024-01-15 10:30+01:00",
        ] {
            let dt = parse_iso_datetime(input)
                .unwrap_or_else(|e| panic!("{input} should parse: {e}"));
            assert_eq!(dt.format("%d/%m/%Y").to_string(), "15/01/2024", "{input}");
        }
    }

    #[test]
    fn test_parse_iso_rejects_garbage() {
        for input in ["not-a-date", "", "15/01/2024", "2024-13-01", "2024-01-15T25:00:00"] {
            assert_eq!(
                parse_iso_datetime(input),
                Err(DateParseError::InvalidIso(input.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_format_date_views() {
        let date = DateValue::Text("2024-01-15T10:30:00Z".to_string());
        assert_eq!(format_date(&date, View::Dashboard).unwrap(), "15/01/2024");
        assert_eq!(format_date(&date, View::Detail).unwrap(), "15/01/2024 10:30");
    }

    #[test]
    fn test_format_date_native_timestamp() {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .unwrap();
        let date = DateValue::Timestamp(ts);
        assert_eq!(format_date(&date, View::Dashboard).unwrap(), "15/01/2024");
        assert_eq!(format_date(&date, View::Detail).unwrap(), "15/01/2024 10:30");
    }

    #[test]
    fn test_format_date_unsupported_value() {
        let date = DateValue::Other(json!(1705314600));
        assert_eq!(
            format_date(&date, View::Dashboard),
            Err(DateParseError::Unsupported("1705314600".to_string()))
        );
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let record = normalize_listing(listing(), View::Dashboard, &labels());

        assert_eq!(record.id, "65a4f1c2e13b5a0012345678");
        assert_eq!(record.title, json!("Untitled"));
        assert_eq!(record.category, json!("General"));
        assert_eq!(record.price, None);
        assert_eq!(record.location, None);
        assert_eq!(record.date_formatted, None);
    }

    #[test]
    fn test_normalize_spanish_defaults() {
        let record = normalize_listing(listing(), View::Detail, &Locale::Es.labels());
        assert_eq!(record.title, json!("Sin título"));
    }

    #[test]
    fn test_normalize_truncates_long_title() {
        let mut raw = listing();
        raw.title = Some(json!("x".repeat(150)));

        let record = normalize_listing(raw.clone(), View::Dashboard, &labels());
        assert_eq!(record.title.as_str().unwrap().chars().count(), 100);

        let record = normalize_listing(raw, View::Detail, &labels());
        assert_eq!(record.title.as_str().unwrap().chars().count(), 100);
    }

    #[test]
    fn test_normalize_passes_through_non_text_title() {
        let mut raw = listing();
        raw.title = Some(json!(12345));

        let record = normalize_listing(raw, View::Dashboard, &labels());
        assert_eq!(record.title, json!(12345));
    }

    #[test]
    fn test_normalize_dashboard_truncates_location() {
        let mut raw = listing();
        raw.location = Some(json!("a".repeat(120)));
        raw.price = Some(json!({"amount": 100, "currency": "CLP"}));

        let record = normalize_listing(raw, View::Dashboard, &labels());
        assert_eq!(record.location.unwrap().as_str().unwrap().len(), 100);
        assert_eq!(record.price, Some(json!({"amount": 100, "currency": "CLP"})));
    }

    #[test]
    fn test_normalize_detail_keeps_location_and_truncates_description() {
        let mut raw = listing();
        raw.location = Some(json!("a".repeat(120)));
        raw.description = Some(json!("d".repeat(700)));
        raw.images = Some(json!(["one.jpg", "two.jpg"]));

        let record = normalize_listing(raw, View::Detail, &labels());
        assert_eq!(record.location.unwrap().as_str().unwrap().len(), 120);
        assert_eq!(record.description.unwrap().as_str().unwrap().len(), 500);
        assert_eq!(record.images, Some(json!(["one.jpg", "two.jpg"])));
    }

    #[test]
    fn test_normalize_dashboard_drops_detail_fields() {
        let mut raw = listing();
        raw.description = Some(json!("text"));
        raw.images = Some(json!([]));

        let record = normalize_listing(raw, View::Dashboard, &labels());
        assert_eq!(record.description, None);
        assert_eq!(record.images, None);
    }

    #[test]
    fn test_normalize_formats_date() {
        let mut raw = listing();
        raw.date = Some(DateValue::Text("2024-01-15T10:30:00Z".to_string()));

        let record = normalize_listing(raw.clone(), View::Dashboard, &labels());
        assert_eq!(record.date_formatted.as_deref(), Some("15/01/2024"));

        let record = normalize_listing(raw, View::Detail, &labels());
        assert_eq!(record.date_formatted.as_deref(), Some("15/01/2024 10:30"));
    }

    #[test]
    fn test_normalize_invalid_date_uses_view_sentinel() {
        let mut raw = listing();
        raw.date = Some(DateValue::Text("not-a-date".to_string()));

        let record = normalize_listing(raw.clone(), View::Dashboard, &labels());
        assert_eq!(record.date_formatted.as_deref(), Some("Invalid date"));

        let record = normalize_listing(raw, View::Detail, &labels());
        assert_eq!(record.date_formatted.as_deref(), Some("No date"));
    }

    #[test]
    fn test_normalize_null_date_uses_view_sentinel() {
        let id = ListingId::parse("65a4f1c2e13b5a0012345678").unwrap();
        let doc = json!({"title": "Sofa", "date": null});

        let raw = Listing::from_document(id.clone(), &doc, Projection::Dashboard);
        let record = normalize_listing(raw, View::Dashboard, &labels());
        assert_eq!(record.title, json!("Sofa"));
        assert_eq!(record.date_formatted.as_deref(), Some("Invalid date"));

        let raw = Listing::from_document(id, &doc, Projection::Detail);
        let record = normalize_listing(raw, View::Detail, &labels());
        assert_eq!(record.date_formatted.as_deref(), Some("No date"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], Value::Null);
        assert_eq!(value["date_formatted"], json!("No date"));
    }

    #[test]
    fn test_normalize_missing_date_omits_formatted_key() {
        let record = normalize_listing(listing(), View::Dashboard, &labels());
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("date").is_none());
        assert!(value.get("date_formatted").is_none());
        assert_eq!(value["id"], json!("65a4f1c2e13b5a0012345678"));
    }
}
