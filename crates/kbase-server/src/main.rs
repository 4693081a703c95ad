//! `kbase` server entry point.
//!
//! Binds the configured blob store, builds the shared state, then serves the
//! Axum router until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use kbase_core::auth::AdminSecret;
use kbase_core::content::ContentStore;
use kbase_storage::{MemoryBackend, StorageBackend};

use kbase_server::app::{AdminLimits, build_router_with_limits};
use kbase_server::config::{ServerConfig, StorageBackendType};
use kbase_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // RUST_LOG wins over KBASE_LOG_LEVEL.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    config.warn_on_fallbacks();
    info!(storage = ?config.storage_backend, "kbase starting");

    let state = build_app_state(&config)?;
    let app = build_router_with_limits(Arc::new(state), AdminLimits::from(&config));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "kbase server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("kbase server stopped");
    Ok(())
}

/// Open the configured store and wrap it with the admin secret.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let storage = open_storage(&config.storage_backend)?;

    let content = storage.map(|backend| {
        info!(backend = backend.kind(), "storage bound");
        ContentStore::new(backend).with_reference_guard(config.enforce_references)
    });
    if content.is_none() {
        warn!("no storage bound, data routes will answer 500");
    }

    let admin = AdminSecret::new(config.admin_password.as_deref());
    if !admin.is_configured() {
        warn!("KBASE_ADMIN_PASSWORD is not set, admin API is locked");
    }

    Ok(AppState::new(content, admin))
}

fn open_storage(
    backend: &StorageBackendType,
) -> anyhow::Result<Option<Arc<dyn StorageBackend>>> {
    let storage: Arc<dyn StorageBackend> = match backend {
        StorageBackendType::None => return Ok(None),
        StorageBackendType::Memory => Arc::new(MemoryBackend::new()),
        #[cfg(feature = "redb-backend")]
        StorageBackendType::Redb { path } => Arc::new(
            kbase_storage::RedbBackend::open(path)
                .with_context(|| format!("failed to open redb at {}", path.display()))?,
        ),
        #[cfg(not(feature = "redb-backend"))]
        StorageBackendType::Redb { .. } => {
            anyhow::bail!("redb backend not compiled in; rebuild with --features redb-backend")
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackendType::RocksDb { path } => Arc::new(
            kbase_storage::RocksDbBackend::open(path)
                .with_context(|| format!("failed to open rocksdb at {}", path.display()))?,
        ),
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackendType::RocksDb { .. } => {
            anyhow::bail!(
                "rocksdb backend not compiled in; rebuild with --features rocksdb-backend"
            )
        }
    };
    Ok(Some(storage))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
