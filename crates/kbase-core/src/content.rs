//! Content store: the rules between HTTP handlers and the blob store.
//!
//! Each collection is one document under a fixed key. Reads fetch all three
//! documents and decode them fail-soft; writes replace a whole document in a
//! single `put`. There is no locking and no version check, so concurrent
//! writers to the same collection resolve as last-write-wins.
//!
//! Imports apply each present collection in turn with an independent `put`.
//! If a later put fails the earlier ones stay written; the error names what
//! was applied so the caller can see the partial state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use kbase_storage::StorageBackend;

use crate::codec::{self, ArticleList};
use crate::error::ContentError;
use crate::model::Collection;

/// All three collections after decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub articles: ArticleList,
    pub categories: Map<String, Value>,
    pub tags: Map<String, Value>,
}

impl Snapshot {
    /// Drop unpublished articles. Categories and tags are kept whole, even
    /// those no published article references.
    #[must_use]
    pub fn published(self) -> Self {
        Self {
            articles: self.articles.published(),
            ..self
        }
    }
}

/// The `data` object of an import request. Absent or `null` fields are left
/// untouched in the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub articles: Option<Value>,
    #[serde(default)]
    pub categories: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
}

impl ImportBundle {
    fn field(&self, collection: Collection) -> Option<&Value> {
        match collection {
            Collection::Articles => self.articles.as_ref(),
            Collection::Categories => self.categories.as_ref(),
            Collection::Tags => self.tags.as_ref(),
        }
    }

    /// Present collections, in apply order.
    pub fn present(&self) -> impl Iterator<Item = (Collection, &Value)> {
        Collection::ALL
            .into_iter()
            .filter_map(|c| self.field(c).map(|doc| (c, doc)))
    }
}

/// Which collections an import wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub applied: Vec<Collection>,
}

/// Reads and writes the three collections over a [`StorageBackend`].
pub struct ContentStore {
    storage: Arc<dyn StorageBackend>,
    enforce_references: bool,
}

impl ContentStore {
    /// Create a store with the reference guard enabled.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            enforce_references: true,
        }
    }

    /// Turn the category/tag reference guard on or off.
    #[must_use]
    pub fn with_reference_guard(mut self, enabled: bool) -> Self {
        self.enforce_references = enabled;
        self
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_kind(&self) -> &'static str {
        self.storage.kind()
    }

    /// Fetch and decode all three collections.
    ///
    /// Never fails: read errors and corrupt documents yield empty collections.
    pub async fn snapshot(&self) -> Snapshot {
        let (articles, categories, tags) = tokio::join!(
            self.load(Collection::Articles),
            self.load(Collection::Categories),
            self.load(Collection::Tags),
        );

        Snapshot {
            articles: codec::decode_articles(articles.as_deref()),
            categories: codec::decode_map(Collection::Categories, categories.as_deref()),
            tags: codec::decode_map(Collection::Tags, tags.as_deref()),
        }
    }

    /// Overwrite a whole collection with `document`, stored verbatim.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Codec`] if the document is not an array or object.
    /// - [`ContentError::DanglingReferences`] if a categories/tags write drops
    ///   ids that stored articles still point at (guard enabled only).
    /// - [`ContentError::Storage`] if the put fails.
    pub async fn replace(
        &self,
        collection: Collection,
        document: &Value,
    ) -> Result<(), ContentError> {
        codec::validate_shape(collection, document)?;
        if self.enforce_references && collection != Collection::Articles {
            self.check_references(collection, document).await?;
        }

        let text = codec::encode(collection, document)?;
        self.storage.put(collection.key(), &text).await?;

        info!(collection = %collection, bytes = text.len(), "collection replaced");
        Ok(())
    }

    /// Apply every present collection of `bundle`, in order articles,
    /// categories, tags. Absent collections are not touched.
    ///
    /// All present documents are shape-checked before the first put. The
    /// reference guard does not apply: an import restores a bundle as-is.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Codec`] if a present document has the wrong shape;
    ///   nothing is written.
    /// - [`ContentError::PartialImport`] if a put fails; collections listed
    ///   in `applied` were already written and are not rolled back.
    pub async fn import(&self, bundle: &ImportBundle) -> Result<ImportReport, ContentError> {
        let mut encoded = Vec::new();
        for (collection, document) in bundle.present() {
            codec::validate_shape(collection, document)?;
            encoded.push((collection, codec::encode(collection, document)?));
        }

        let mut report = ImportReport::default();
        for (collection, text) in encoded {
            if let Err(reason) = self.storage.put(collection.key(), &text).await {
                warn!(
                    collection = %collection,
                    applied = ?report.applied,
                    error = %reason,
                    "import stopped part way"
                );
                return Err(ContentError::PartialImport {
                    applied: report.applied,
                    failed: collection,
                    reason,
                });
            }
            report.applied.push(collection);
        }

        info!(applied = ?report.applied, "import complete");
        Ok(report)
    }

    /// Read one document, treating a failed read as absent.
    async fn load(&self, collection: Collection) -> Option<String> {
        match self.storage.get(collection.key()).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(key = collection.key(), error = %e, "read failed, treating as absent");
                None
            }
        }
    }

    /// Refuse to remove category/tag ids that stored articles reference.
    ///
    /// Only ids present in the currently stored collection count: references
    /// that were already dangling do not block a write.
    async fn check_references(
        &self,
        collection: Collection,
        document: &Value,
    ) -> Result<(), ContentError> {
        let (stored_articles, stored_collection) =
            tokio::join!(self.load(Collection::Articles), self.load(collection));
        let articles = codec::decode_articles(stored_articles.as_deref());
        let existing = codec::decode_map(collection, stored_collection.as_deref());
        let kept = codec::defined_ids(document);

        let mut dangling: Vec<String> = Vec::new();
        for article in &articles {
            let referenced: Vec<&str> = match collection {
                Collection::Categories => article.category_id().into_iter().collect(),
                Collection::Tags => article.tag_ids().collect(),
                Collection::Articles => Vec::new(),
            };
            for id in referenced {
                if existing.contains_key(id)
                    && !kept.contains(&id)
                    && !dangling.iter().any(|d| d == id)
                {
                    dangling.push(id.to_owned());
                }
            }
        }

        if dangling.is_empty() {
            Ok(())
        } else {
            Err(ContentError::DanglingReferences {
                collection,
                ids: dangling,
            })
        }
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("backend", &self.storage.kind())
            .field("enforce_references", &self.enforce_references)
            .finish()
    }
}
