//! Listing documents
//!
//! Listings live in a schemaless collection: apart from the identifier every
//! field may be missing, `null`, or of an unexpected type. The types here keep
//! the untyped values as [`serde_json::Value`] and leave interpretation to the
//! [`crate::normalize`] module.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters in a listing identifier (12 bytes)
pub const ID_LEN: usize = 24;

/// Key used by exported documents to carry a native timestamp
pub const DATE_TAG: &str = "$date";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier must be {ID_LEN} characters long, got {0}")]
    InvalidLength(usize),

    #[error("identifier must be hexadecimal: {0}")]
    InvalidCharacters(String),
}

/// Opaque listing identifier in object-id form (24 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListingId(String);

impl ListingId {
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if input.len() != ID_LEN {
            return Err(IdError::InvalidLength(input.len()));
        }

        if !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidCharacters(input.to_string()));
        }

        Ok(Self(input.to_ascii_lowercase()))
    }

    /// Build an identifier from its parts: a 4-byte big-endian timestamp,
    /// 5 random bytes and the low 3 bytes of a counter.
    pub fn from_parts(timestamp: u32, random: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);

        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ListingId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ListingId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ListingId> for String {
    fn from(id: ListingId) -> Self {
        id.0
    }
}

/// A `date` field as found in a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DateValue {
    /// Free text, expected to be ISO-8601
    Text(String),
    /// A native timestamp (`{"$date": ...}` in exported documents)
    Timestamp(DateTime<FixedOffset>),
    /// Anything else; formatting it always fails
    Other(Value),
}

impl From<Value> for DateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => DateValue::Text(text),
            Value::Object(ref map) => match tagged_timestamp(map) {
                Some(ts) => DateValue::Timestamp(ts),
                None => DateValue::Other(value),
            },
            other => DateValue::Other(other),
        }
    }
}

impl From<DateValue> for Value {
    fn from(date: DateValue) -> Self {
        match date {
            DateValue::Text(text) => Value::String(text),
            DateValue::Timestamp(ts) => {
                let mut map = Map::new();
                map.insert(DATE_TAG.to_string(), Value::String(ts.to_rfc3339()));
                Value::Object(map)
            }
            DateValue::Other(value) => value,
        }
    }
}

/// Decode `{"$date": "<rfc3339>"}` or `{"$date": <epoch millis>}`
fn tagged_timestamp(map: &Map<String, Value>) -> Option<DateTime<FixedOffset>> {
    if map.len() != 1 {
        return None;
    }

    match map.get(DATE_TAG)? {
        Value::String(text) => DateTime::parse_from_rfc3339(text).ok(),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            let utc = Utc.timestamp_millis_opt(millis).single()?;
            Some(utc.fixed_offset())
        }
        _ => None,
    }
}

/// Which fields a view reads from the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Dashboard,
    Detail,
}

impl Projection {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Projection::Dashboard => &["title", "category", "price", "location", "date"],
            Projection::Detail => &[
                "title",
                "category",
                "price",
                "location",
                "description",
                "date",
                "images",
            ],
        }
    }

    pub fn includes(self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

/// A listing read from the collection, restricted to a projection
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub title: Option<Value>,
    pub category: Option<Value>,
    pub price: Option<Value>,
    pub location: Option<Value>,
    pub description: Option<Value>,
    pub date: Option<DateValue>,
    pub images: Option<Value>,
}

impl Listing {
    /// A listing with nothing but its identifier
    pub fn bare(id: ListingId) -> Self {
        Self {
            id,
            title: None,
            category: None,
            price: None,
            location: None,
            description: None,
            date: None,
            images: None,
        }
    }

    /// Extract the projected fields of a stored document
    ///
    /// Fields outside the projection are dropped and `null` values count as
    /// missing, except for `date`: a `null` date is kept so that the view
    /// shows its sentinel. A document that is not a JSON object yields a
    /// bare listing.
    pub fn from_document(id: ListingId, document: &Value, projection: Projection) -> Self {
        let raw = |name: &str| -> Option<&Value> {
            if !projection.includes(name) {
                return None;
            }
            document.get(name)
        };
        let field = |name: &str| raw(name).filter(|v| !v.is_null()).cloned();

        Self {
            title: field("title"),
            category: field("category"),
            price: field("price"),
            location: field("location"),
            description: field("description"),
            date: raw("date").cloned().map(DateValue::from),
            images: field("images"),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "65a4f1c2e13b5a0012345678";

    #[test]
    fn test_parse_valid_id() {
        let id = ListingId::parse(ID).unwrap();
        assert_eq!(id.as_str(), ID);
        assert_eq!(id.to_string(), ID);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = ListingId::parse("65A4F1C2E13B5A0012345678").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(ListingId::parse("abc"), Err(IdError::InvalidLength(3)));
        assert_eq!(ListingId::parse(""), Err(IdError::InvalidLength(0)));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let result = ListingId::parse("zza4f1c2e13b5a0012345678");
        assert!(matches!(result, Err(IdError::InvalidCharacters(_))));
    }

    #[test]
    fn test_parse_rejects_multibyte_input_of_matching_byte_length() {
        // 22 ASCII characters plus one two-byte character: 24 bytes
        let input = "65a4f1c2e13b5a00123456é";
        assert_eq!(input.len(), ID_LEN);
        assert!(ListingId::parse(input).is_err());
    }

    #[test]
    fn test_from_parts_layout() {
        let id = ListingId::from_parts(0x65a4_f1c2, [0xe1, 0x3b, 0x5a, 0x00, 0x12], 0xff34_5678);
        assert_eq!(id.as_str(), ID);
        assert!(ListingId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_date_value_from_text() {
        let date = DateValue::from(json!("2024-01-15T10:30:00Z"));
        assert_eq!(date, DateValue::Text("2024-01-15T10:30:00Z".to_string()));
    }

    #[test]
    fn test_date_value_from_tagged_rfc3339() {
        let date = DateValue::from(json!({"$date": "2024-01-15T10:30:00+00:00"}));
        let DateValue::Timestamp(ts) = date else {
            panic!("expected a timestamp");
        };
        assert_eq!(ts.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_date_value_from_tagged_millis() {
        let date = DateValue::from(json!({"$date": 1_705_314_600_000i64}));
        let DateValue::Timestamp(ts) = date else {
            panic!("expected a timestamp");
        };
        assert_eq!(ts.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_date_value_other_shapes() {
        assert!(matches!(DateValue::from(json!(42)), DateValue::Other(_)));
        assert!(matches!(
            DateValue::from(json!({"$date": "yesterday"})),
            DateValue::Other(_)
        ));
        assert!(matches!(
            DateValue::from(json!({"$date": "2024-01-15T10:30:00Z", "extra": 1})),
            DateValue::Other(_)
        ));
    }

    #[test]
    fn test_date_value_serializes_back_to_document_shape() {
        let date = DateValue::from(json!({"$date": "2024-01-15T10:30:00+00:00"}));
        let value = serde_json::to_value(&date).unwrap();
        assert_eq!(value, json!({"$date": "2024-01-15T10:30:00+00:00"}));
    }

    #[test]
    fn test_from_document_dashboard_projection() {
        let doc = json!({
            "title": "Bicycle",
            "category": "Sports",
            "price": 150,
            "location": "Santiago",
            "description": "Barely used",
            "date": "2024-01-15",
            "images": ["a.jpg"],
            "seller_phone": "+56 9 1234 5678"
        });

        let listing = Listing::from_document(ListingId::parse(ID).unwrap(), &doc, Projection::Dashboard);

        assert_eq!(listing.title, Some(json!("Bicycle")));
        assert_eq!(listing.category, Some(json!("Sports")));
        assert_eq!(listing.price, Some(json!(150)));
        assert_eq!(listing.location, Some(json!("Santiago")));
        assert_eq!(listing.date, Some(DateValue::Text("2024-01-15".to_string())));
        assert_eq!(listing.description, None);
        assert_eq!(listing.images, None);
    }

    #[test]
    fn test_from_document_detail_projection() {
        let doc = json!({"description": "Barely used", "images": ["a.jpg"]});

        let listing = Listing::from_document(ListingId::parse(ID).unwrap(), &doc, Projection::Detail);

        assert_eq!(listing.description, Some(json!("Barely used")));
        assert_eq!(listing.images, Some(json!(["a.jpg"])));
    }

    #[test]
    fn test_from_document_treats_null_as_missing() {
        let doc = json!({"title": null, "category": null, "date": null});

        let listing = Listing::from_document(ListingId::parse(ID).unwrap(), &doc, Projection::Detail);

        assert_eq!(listing.title, None);
        assert_eq!(listing.category, None);
        assert_eq!(listing.date, Some(DateValue::Other(Value::Null)));
    }

    #[test]
    fn test_from_document_non_object() {
        let id = ListingId::parse(ID).unwrap();
        let listing = Listing::from_document(id.clone(), &json!("garbage"), Projection::Detail);
        assert_eq!(listing, Listing::bare(id));
    }
}
