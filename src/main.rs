use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use catalog_media::api;
use catalog_media::catalog::Database;
use catalog_media::config::{Config, StorageBackend, StorageConfig};
use catalog_media::object_store::{BucketStore, LocalStore, ObjectStore};
use catalog_media::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing(&std::env::var("LOG_FORMAT").unwrap_or_default());
    info!(version = env!("CARGO_PKG_VERSION"), "catalog-media starting");

    let config = Config::load()?;
    let db = Database::open(&config.server.data_dir)
        .with_context(|| format!("opening catalog in {}", config.server.data_dir))?;
    let store = open_store(&config.storage)?;

    let state = Arc::new(AppState::new(config, db, store));
    let listener = tokio::net::TcpListener::bind(&state.config.server.bind_address).await?;
    info!(address = %state.config.server.bind_address, "Serving upload sessions");

    axum::serve(listener, api::create_router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let abandoned = state.close_all_sessions().await;
    info!(abandoned, outstanding_previews = state.previews.outstanding(), "Stopped");
    Ok(())
}

/// `LOG_FORMAT=gcp` for Cloud Logging, `json` for line-delimited JSON,
/// anything else for human-readable output. Filtered by `RUST_LOG`.
fn init_tracing(format: &str) {
    let output: Box<dyn Layer<Registry> + Send + Sync> = match format.to_lowercase().as_str() {
        "gcp" => tracing_stackdriver::layer().boxed(),
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .init();
}

fn open_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match storage.backend {
        StorageBackend::Local => {
            let store = LocalStore::new(&storage.local_storage_path)?;
            info!(path = %storage.local_storage_path, "Storing objects on local disk");
            Ok(Arc::new(store))
        }
        StorageBackend::Bucket => {
            let (Some(url), Some(bucket), Some(api_key)) = (
                storage.url.as_deref(),
                storage.bucket.as_deref(),
                storage.api_key.as_deref(),
            ) else {
                anyhow::bail!("bucket storage settings missing after validation");
            };
            let store = BucketStore::new(url, bucket, api_key)?;
            info!(%url, %bucket, "Storing objects in hosted bucket");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    info!("Shutdown signal received, draining connections");
}
