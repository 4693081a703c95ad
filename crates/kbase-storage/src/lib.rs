//! Blob storage abstraction for `kbase`.
//!
//! This crate defines the [`StorageBackend`] trait, a get/put interface over
//! named text documents. It knows nothing about articles or categories; the
//! content store in `kbase-core` decides which keys exist and what the JSON
//! inside them looks like.
//!
//! Three implementations are provided:
//!
//! - [`RedbBackend`]: default persistent store, pure Rust (feature `redb-backend`)
//! - [`RocksDbBackend`]: `RocksDB` directory store (feature `rocksdb-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and throwaway instances
//!
//! There are no transactions spanning keys and no retries. Two writers racing
//! on one key resolve as last-write-wins.

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDbBackend;

/// A pluggable store of named text blobs.
///
/// Keys are short fixed names (`articles`, `categories`, `tags`). Values are
/// whole JSON documents stored exactly as handed in.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve the document stored under `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails or the
    /// stored value is not valid UTF-8.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store a document under `key`, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Short backend name used in health output and logs.
    fn kind(&self) -> &'static str;
}
