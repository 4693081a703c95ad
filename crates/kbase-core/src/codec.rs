//! Document codec.
//!
//! Collections are stored as whatever JSON the last writer sent. Reading
//! normalizes that into one canonical in-memory form; writing never does.
//!
//! - Articles arrive as an array of records or as an object mapping
//!   id → record ([`WireArticles`]). Both become an [`ArticleList`], keeping
//!   document order.
//! - Categories and tags become an id → record object. An array of records
//!   is re-keyed by each record's `id`.
//! - Absent documents decode to empty. Malformed or oddly shaped documents
//!   also decode to empty and are logged, so a corrupt blob never fails a
//!   public read.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CodecError;
use crate::model::{ArticleRecord, Collection};

/// The two accepted wire shapes of the articles collection.
#[derive(Debug, Clone, PartialEq)]
pub enum WireArticles {
    /// `[record, record, ...]`
    Sequence(Vec<Value>),
    /// `{"id": record, ...}` in document order.
    Mapping(Map<String, Value>),
}

impl WireArticles {
    /// Collapse either shape into the canonical ordered list.
    ///
    /// Entries that are not JSON objects are dropped.
    #[must_use]
    pub fn normalize(self) -> ArticleList {
        let values: Vec<Value> = match self {
            Self::Sequence(items) => items,
            Self::Mapping(map) => map.into_iter().map(|(_, v)| v).collect(),
        };

        let total = values.len();
        let list: ArticleList = values
            .into_iter()
            .filter_map(ArticleRecord::from_value)
            .collect();

        if list.len() < total {
            warn!(
                dropped = total - list.len(),
                "skipping article entries that are not JSON objects"
            );
        }
        list
    }
}

impl TryFrom<Value> for WireArticles {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => Ok(Self::Sequence(items)),
            Value::Object(map) => Ok(Self::Mapping(map)),
            other => Err(CodecError::UnexpectedShape {
                collection: Collection::Articles,
                found: json_kind(&other),
            }),
        }
    }
}

/// Canonical articles: ordered records plus an id index.
///
/// Serializes as a plain JSON array. When two records share an id, both stay
/// in the sequence and [`ArticleList::get`] returns the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleList {
    records: Vec<ArticleRecord>,
    index: HashMap<String, usize>,
}

impl ArticleList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, indexing its id if not already seen.
    pub fn push(&mut self, record: ArticleRecord) {
        if let Some(id) = record.id() {
            self.index
                .entry(id.to_owned())
                .or_insert(self.records.len());
        }
        self.records.push(record);
    }

    /// Look up a record by id in O(1).
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ArticleRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArticleRecord> {
        self.records.iter()
    }

    /// Keep only records with `published == true`, preserving order.
    #[must_use]
    pub fn published(self) -> Self {
        self.records
            .into_iter()
            .filter(ArticleRecord::is_published)
            .collect()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.records
    }
}

impl FromIterator<ArticleRecord> for ArticleList {
    fn from_iter<I: IntoIterator<Item = ArticleRecord>>(iter: I) -> Self {
        let mut list = Self::new();
        for record in iter {
            list.push(record);
        }
        list
    }
}

impl<'a> IntoIterator for &'a ArticleList {
    type Item = &'a ArticleRecord;
    type IntoIter = std::slice::Iter<'a, ArticleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for ArticleList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

// ── Strict parsing ───────────────────────────────────────────────────

/// Parse raw text as JSON, tagging failures with the collection.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if `raw` is not valid JSON.
pub fn parse_document(collection: Collection, raw: &str) -> Result<Value, CodecError> {
    serde_json::from_str(raw).map_err(|e| CodecError::Malformed {
        collection,
        reason: e.to_string(),
    })
}

/// Parse a stored articles document.
///
/// # Errors
///
/// Returns [`CodecError`] if the text is not JSON or is neither an array nor
/// an object.
pub fn parse_articles(raw: &str) -> Result<ArticleList, CodecError> {
    let value = parse_document(Collection::Articles, raw)?;
    Ok(WireArticles::try_from(value)?.normalize())
}

/// Parse a stored categories or tags document into an id → record map.
///
/// # Errors
///
/// Returns [`CodecError`] if the text is not JSON or is neither an array nor
/// an object.
pub fn parse_map(collection: Collection, raw: &str) -> Result<Map<String, Value>, CodecError> {
    match parse_document(collection, raw)? {
        Value::Object(map) => Ok(map),
        Value::Array(items) => Ok(key_by_id(collection, items)),
        other => Err(CodecError::UnexpectedShape {
            collection,
            found: json_kind(&other),
        }),
    }
}

// ── Fail-soft decoding ───────────────────────────────────────────────

/// Decode stored articles; absent or unreadable documents become empty.
#[must_use]
pub fn decode_articles(raw: Option<&str>) -> ArticleList {
    let Some(raw) = raw else {
        return ArticleList::new();
    };
    parse_articles(raw).unwrap_or_else(|e| {
        warn!(key = Collection::Articles.key(), error = %e, "using empty collection");
        ArticleList::new()
    })
}

/// Decode stored categories or tags; absent or unreadable documents become
/// an empty map.
#[must_use]
pub fn decode_map(collection: Collection, raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    parse_map(collection, raw).unwrap_or_else(|e| {
        warn!(key = collection.key(), error = %e, "using empty collection");
        Map::new()
    })
}

// ── Writing ──────────────────────────────────────────────────────────

/// Reject documents a reader could never decode: anything but an array or
/// an object.
///
/// # Errors
///
/// Returns [`CodecError::UnexpectedShape`] for scalars and null.
pub fn validate_shape(collection: Collection, document: &Value) -> Result<(), CodecError> {
    match document {
        Value::Array(_) | Value::Object(_) => Ok(()),
        other => Err(CodecError::UnexpectedShape {
            collection,
            found: json_kind(other),
        }),
    }
}

/// Serialize a document exactly as given. No shape change.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode(collection: Collection, document: &Value) -> Result<String, CodecError> {
    serde_json::to_string(document).map_err(|e| CodecError::Encode {
        collection,
        reason: e.to_string(),
    })
}

/// Ids defined by a categories/tags document in either shape.
#[must_use]
pub fn defined_ids(document: &Value) -> Vec<&str> {
    match document {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .collect(),
        _ => Vec::new(),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn key_by_id(collection: Collection, items: Vec<Value>) -> Map<String, Value> {
    let total = items.len();
    let map: Map<String, Value> = items
        .into_iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_str)?.to_owned();
            Some((id, item))
        })
        .collect();
    if map.len() < total {
        warn!(
            key = collection.key(),
            dropped = total - map.len(),
            "skipping records without a string id or with a repeated id"
        );
    }
    map
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
