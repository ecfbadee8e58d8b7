//! Core domain types for the dish catalog.

use serde::{Deserialize, Deserializer, Serialize};

/// Page number used when the caller supplies none (or a non-positive one).
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when the caller supplies none (or a non-positive one).
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Envelope code the dish API uses for success.
pub const API_SUCCESS_CODE: i64 = 200;

// ---------------------------------------------------------------------------
// Dish
// ---------------------------------------------------------------------------

/// Canonical dish record. Every source is normalized into this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    /// Unique within one loaded snapshot.
    #[serde(default)]
    pub id: String,
    /// Display name; empty when the source row was malformed.
    #[serde(default)]
    pub name: String,
    /// Single category label.
    #[serde(default)]
    pub tag: String,
    /// Locations serving the dish, trimmed and never containing empty entries.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub canteen: Vec<String>,
}

impl Dish {
    /// Synthetic, order-based identifier for sources without native ids.
    pub fn synthetic_id(index: usize) -> String {
        format!("dish_{index}")
    }

    /// Whether the dish is served at exactly `canteen` (element match, not substring).
    pub fn served_at(&self, canteen: &str) -> bool {
        self.canteen.iter().any(|c| c == canteen)
    }
}

/// Split a comma-joined canteen field into trimmed, non-empty entries.
///
/// Accepts both ASCII `,` and the full-width `，` separator.
pub fn split_canteens(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// DishQuery
// ---------------------------------------------------------------------------

/// Caller-supplied query. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canteen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl DishQuery {
    /// Requested page, defaulting to 1 when absent or non-positive.
    pub fn normalized_page(&self) -> usize {
        normalize_positive(self.page, DEFAULT_PAGE)
    }

    /// Requested page size, defaulting to 20 when absent or non-positive.
    pub fn normalized_page_size(&self) -> usize {
        normalize_positive(self.page_size, DEFAULT_PAGE_SIZE)
    }

    /// Tag constraint; an empty string counts as absent.
    pub fn tag(&self) -> Option<&str> {
        non_empty(self.tag.as_deref())
    }

    /// Canteen constraint; an empty string counts as absent.
    pub fn canteen(&self) -> Option<&str> {
        non_empty(self.canteen.as_deref())
    }

    /// Search constraint; an empty string counts as absent.
    pub fn search(&self) -> Option<&str> {
        non_empty(self.search.as_deref())
    }

    /// Query-string pairs for the remote API, including only supplied values.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size.filter(|s| *s > 0) {
            pairs.push(("page_size", size.to_string()));
        }
        if let Some(tag) = self.tag() {
            pairs.push(("tag", tag.to_string()));
        }
        if let Some(canteen) = self.canteen() {
            pairs.push(("canteen", canteen.to_string()));
        }
        if let Some(search) = self.search() {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

/// `value` when positive, otherwise `default`.
pub fn normalize_positive(value: Option<i64>, default: usize) -> usize {
    match value {
        Some(v) if v > 0 => usize::try_from(v).unwrap_or(default),
        _ => default,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One page of dishes. `total` counts matches before pagination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DishPage {
    #[serde(default, deserialize_with = "null_as_empty_dishes")]
    pub list: Vec<Dish>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

fn null_as_empty_dishes<'de, D>(deserializer: D) -> std::result::Result<Vec<Dish>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Dish>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Distinct filter values over a full dataset, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Facets {
    pub tags: Vec<String>,
    pub canteens: Vec<String>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Wrapping response structure used by the remote services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}
