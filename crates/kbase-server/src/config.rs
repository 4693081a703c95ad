//! Server configuration.
//!
//! Loaded from environment variables with sensible defaults. The resulting
//! [`ServerConfig`] is read once at startup and never changes afterwards.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

/// Default admin concurrency limit, shared by every admin route.
pub const DEFAULT_ADMIN_CONCURRENCY: usize = 32;

/// Default cap on admin request bodies (32 MiB). A write carries a whole
/// collection, so this sits well above axum's 2 MiB default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Which blob store to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// No store binding. Health reports it and data routes answer 500.
    None,
    /// In-memory store, lost on restart.
    Memory,
    /// redb file at `<path>/kbase.redb`.
    Redb { path: PathBuf },
    /// RocksDB directory at `<path>`.
    RocksDb { path: PathBuf },
}

/// Top-level server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend selection.
    pub storage_backend: StorageBackendType,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// The shared admin secret. `None` locks the admin API.
    pub admin_password: Option<String>,
    /// Reject category/tag writes that would orphan article references.
    pub enforce_references: bool,
    /// Maximum in-flight requests across all of `/api/admin/*` combined.
    pub admin_concurrency: usize,
    /// Largest accepted admin request body, in bytes.
    pub max_body_bytes: usize,
    /// A `KBASE_STORAGE` value that was not recognised and fell back to memory.
    pub unrecognized_storage: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `KBASE_BIND_ADDR` | `PORT` on `0.0.0.0`, else `127.0.0.1:8787` |
    /// | `KBASE_STORAGE` | `memory` (`redb`, `rocksdb`, `none`) |
    /// | `KBASE_STORAGE_PATH` | `./data` |
    /// | `KBASE_ADMIN_PASSWORD` | `ADMIN_PASSWORD`, else unset |
    /// | `KBASE_LOG_LEVEL` | `info` |
    /// | `KBASE_ENFORCE_REFERENCES` | `true` |
    /// | `KBASE_ADMIN_CONCURRENCY` | `32` |
    /// | `KBASE_MAX_BODY_BYTES` | `33554432` (32 MiB) |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = if let Some(addr) = var("KBASE_BIND_ADDR").and_then(|v| v.parse().ok()) {
            addr
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(8787);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8787))
        };

        let storage_path = PathBuf::from(
            var("KBASE_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned()),
        );

        let storage_setting = var("KBASE_STORAGE").unwrap_or_else(|| "memory".to_owned());
        let mut unrecognized_storage = None;
        let storage_backend = match storage_setting.to_lowercase().as_str() {
            "none" | "off" => StorageBackendType::None,
            "memory" => StorageBackendType::Memory,
            "redb" => StorageBackendType::Redb {
                path: storage_path.join("kbase.redb"),
            },
            "rocksdb" => StorageBackendType::RocksDb { path: storage_path },
            _ => {
                unrecognized_storage = Some(storage_setting);
                StorageBackendType::Memory
            }
        };

        let log_level = var("KBASE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let admin_password = var("KBASE_ADMIN_PASSWORD")
            .or_else(|| var("ADMIN_PASSWORD"))
            .filter(|p| !p.is_empty());

        let enforce_references = var("KBASE_ENFORCE_REFERENCES")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let admin_concurrency = var("KBASE_ADMIN_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_ADMIN_CONCURRENCY);

        let max_body_bytes = var("KBASE_MAX_BODY_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Self {
            bind_addr,
            storage_backend,
            log_level,
            admin_password,
            enforce_references,
            admin_concurrency,
            max_body_bytes,
            unrecognized_storage,
        }
    }

    /// Log the settings that were ignored in favour of a default.
    ///
    /// Configuration is read before the subscriber is installed, so this runs
    /// as a separate step once logging is up.
    pub fn warn_on_fallbacks(&self) {
        if let Some(value) = &self.unrecognized_storage {
            warn!(
                value = %value,
                "unknown KBASE_STORAGE value, falling back to in-memory storage"
            );
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("storage_backend", &self.storage_backend)
            .field("log_level", &self.log_level)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("enforce_references", &self.enforce_references)
            .field("admin_concurrency", &self.admin_concurrency)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("unrecognized_storage", &self.unrecognized_storage)
            .finish()
    }
}
