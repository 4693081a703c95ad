//! Pure-Rust redb storage backend.
//!
//! The default persistent store: a single database file holding one table of
//! `name -> JSON text`. Feature-gated behind `redb-backend`.
//!
//! Each `put` is its own write transaction. Nothing groups puts to different
//! keys, so a multi-collection import can stop half way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{StorageBackend, StorageError};

/// The single table holding every document.
const BLOB_TABLE: TableDefinition<&str, &str> = TableDefinition::new("blobs");

/// A storage backend backed by a redb database file.
///
/// Blocking redb calls are offloaded to the Tokio blocking thread pool.
///
/// # Examples
///
/// ```no_run
/// # use kbase_storage::RedbBackend;
/// let backend = RedbBackend::open("/var/lib/kbase/kbase.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbBackend {
    /// Open or create a redb database at the given file path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be created or opened,
    /// or [`StorageError::Transaction`] if the table cannot be initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Open {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let db = Database::create(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let txn = db.begin_write().map_err(|e| StorageError::Transaction {
            reason: e.to_string(),
        })?;
        {
            // Opening the table in a write txn creates it if missing.
            let _table = txn
                .open_table(BLOB_TABLE)
                .map_err(|e| StorageError::MissingTable {
                    name: format!("blobs: {e}"),
                })?;
        }
        txn.commit().map_err(|e| StorageError::Transaction {
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "redb store opened");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Return the filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let task_key = key.clone();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_read().map_err(|e| StorageError::Transaction {
                reason: e.to_string(),
            })?;
            let table = txn
                .open_table(BLOB_TABLE)
                .map_err(|e| StorageError::MissingTable {
                    name: format!("blobs: {e}"),
                })?;
            let value = table
                .get(task_key.as_str())
                .map_err(|e| StorageError::Read {
                    key: task_key.clone(),
                    reason: e.to_string(),
                })?
                .map(|v| v.value().to_owned());
            Ok(value)
        })
        .await
        .map_err(|e| StorageError::Read {
            key,
            reason: format!("blocking task failed: {e}"),
        })?
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let task_key = key.clone();
        let value = value.to_owned();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write().map_err(|e| StorageError::Transaction {
                reason: e.to_string(),
            })?;
            {
                let mut table =
                    txn.open_table(BLOB_TABLE)
                        .map_err(|e| StorageError::MissingTable {
                            name: format!("blobs: {e}"),
                        })?;
                table
                    .insert(task_key.as_str(), value.as_str())
                    .map_err(|e| StorageError::Write {
                        key: task_key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(|e| StorageError::Write {
                key: task_key,
                reason: format!("commit failed: {e}"),
            })
        })
        .await
        .map_err(|e| StorageError::Write {
            key,
            reason: format!("blocking task failed: {e}"),
        })?
    }

    fn kind(&self) -> &'static str {
        "redb"
    }
}
