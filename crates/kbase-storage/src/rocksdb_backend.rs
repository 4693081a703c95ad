//! `RocksDB` storage backend.
//!
//! Wraps the `rocksdb` crate behind the [`StorageBackend`] trait. All calls
//! run on the blocking pool since `RocksDB` is a synchronous C++ library.
//! Values are stored as UTF-8 bytes and validated on the way out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{DBWithThreadMode, MultiThreaded, Options};

use crate::{StorageBackend, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

/// A storage backend backed by a `RocksDB` directory.
///
/// # Examples
///
/// ```no_run
/// # use kbase_storage::RocksDbBackend;
/// let backend = RocksDbBackend::open("/var/lib/kbase/rocksdb").unwrap();
/// ```
#[derive(Clone)]
pub struct RocksDbBackend {
    db: Arc<Db>,
    path: PathBuf,
}

impl std::fmt::Debug for RocksDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RocksDbBackend {
    /// Open a `RocksDB` database at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if `RocksDB` fails to open or create the
    /// database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = Db::open(&opts, path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

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
impl StorageBackend for RocksDbBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let task_key = key.clone();
        tokio::task::spawn_blocking(move || {
            let raw = db.get(task_key.as_bytes()).map_err(|e| StorageError::Read {
                key: task_key.clone(),
                reason: e.to_string(),
            })?;
            raw.map(|bytes| {
                String::from_utf8(bytes).map_err(|e| StorageError::Read {
                    key: task_key.clone(),
                    reason: format!("stored value is not UTF-8: {e}"),
                })
            })
            .transpose()
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
            db.put(task_key.as_bytes(), value.as_bytes())
                .map_err(|e| StorageError::Write {
                    key: task_key,
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| StorageError::Write {
            key,
            reason: format!("blocking task failed: {e}"),
        })?
    }

    fn kind(&self) -> &'static str {
        "rocksdb"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RocksDbBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get("tags").await.unwrap(), None);
        backend.put("tags", r#"{"t1":{"id":"t1","name":"async"}}"#).await.unwrap();
        assert_eq!(
            backend.get("tags").await.unwrap().as_deref(),
            Some(r#"{"t1":{"id":"t1","name":"async"}}"#)
        );
    }
}
