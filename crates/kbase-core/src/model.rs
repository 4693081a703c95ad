//! Content model.
//!
//! Stored documents are kept as raw JSON so that whatever a writer sends is
//! what a reader gets back. [`ArticleRecord`] wraps one such object and offers
//! typed accessors for the few fields the server itself looks at. The typed
//! [`Article`], [`Category`] and [`Tag`] structs describe the shape clients are
//! expected to write and are what the CLI builds new records from.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::generate_id;

/// One of the three logical collections, each stored as a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Articles,
    Categories,
    Tags,
}

impl Collection {
    /// All collections, in the order an import applies them.
    pub const ALL: [Self; 3] = [Self::Articles, Self::Categories, Self::Tags];

    /// The fixed storage key for this collection.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Articles => "articles",
            Self::Categories => "categories",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Current time as ISO-8601 UTC with millisecond precision, e.g.
/// `2024-05-01T12:00:00.000Z`.
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A stored article, exactly as written by the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleRecord(Map<String, Value>);

impl ArticleRecord {
    /// Wrap a JSON value. Returns `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The article id, if present and a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Only the JSON boolean `true` counts as published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self.0.get("published"), Some(Value::Bool(true)))
    }

    /// The referenced category id. Null and empty strings mean "none".
    #[must_use]
    pub fn category_id(&self) -> Option<&str> {
        self.0
            .get("categoryId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Referenced tag ids in stored order. Non-string entries are skipped.
    pub fn tag_ids(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("tagIds")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Article> for ArticleRecord {
    fn from(article: Article) -> Self {
        let mut map = Map::new();
        map.insert("id".to_owned(), Value::String(article.id));
        map.insert("title".to_owned(), Value::String(article.title));
        map.insert("content".to_owned(), Value::String(article.content));
        map.insert(
            "categoryId".to_owned(),
            article.category_id.map_or(Value::Null, Value::String),
        );
        map.insert(
            "tagIds".to_owned(),
            Value::Array(article.tag_ids.into_iter().map(Value::String).collect()),
        );
        map.insert("published".to_owned(), Value::Bool(article.published));
        map.insert("createdAt".to_owned(), Value::String(article.created_at));
        map.insert("updatedAt".to_owned(), Value::String(article.updated_at));
        Self(map)
    }
}

/// The article shape clients write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Article {
    /// A new unpublished article with a fresh id and matching timestamps.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: generate_id(),
            title: title.into(),
            content: content.into(),
            category_id: None,
            tag_ids: Vec::new(),
            published: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Bump `updatedAt` to now.
    pub fn touch(&mut self) {
        self.updated_at = now_iso();
    }
}

/// A category; articles point at it through `categoryId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
        }
    }
}

/// A tag; articles point at it through `tagIds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

impl Tag {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
        }
    }
}
