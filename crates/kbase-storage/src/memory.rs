//! In-memory storage backend.
//!
//! Documents live in a `BTreeMap` behind a `RwLock` and vanish when the
//! process exits. Used by the test suites and by `KBASE_STORAGE=memory`.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{StorageBackend, StorageError};

/// An in-memory storage backend backed by a `BTreeMap`.
///
/// Cloning the backend yields another handle to the same documents, which
/// lets a test keep one handle while the server owns the other.
///
/// # Examples
///
/// ```
/// # use kbase_storage::{MemoryBackend, StorageBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.put("tags", "{}").await.unwrap();
/// assert_eq!(backend.get("tags").await.unwrap().as_deref(), Some("{}"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-seeded with the given documents.
    #[must_use]
    pub fn with_documents<K, V>(documents: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let data = documents
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Copy of every stored document, ordered by key.
    pub async fn dump(&self) -> BTreeMap<String, String> {
        self.data.read().await.clone()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_unwritten_key_returns_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("articles").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_whole_document() {
        let backend = MemoryBackend::new();
        backend.put("articles", r#"[{"id":"a"}]"#).await.unwrap();
        backend.put("articles", "[]").await.unwrap();
        assert_eq!(backend.get("articles").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn seeded_documents_are_readable() {
        let backend = MemoryBackend::with_documents([("categories", "{}"), ("tags", "[]")]);
        assert_eq!(backend.get("categories").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(backend.get("tags").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.get("articles").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        backend.put("tags", "{}").await.unwrap();
        assert_eq!(clone.get("tags").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(clone.dump().await.len(), 1);
    }

    #[test]
    fn kind_is_memory() {
        assert_eq!(MemoryBackend::new().kind(), "memory");
    }
}
