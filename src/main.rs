use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use drops_api::{
    config::{Config, StorageBackend},
    create_router,
    db::{self, Cache, InventoryStore, MemoryStore, MenuStore, PgStore},
    AppState, StateOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drops_api=info,tower_http=info")),
        )
        .init();

    tracing::info!(storage = ?config.storage, "Starting drops-api");

    let (menu_store, inventory_store) = build_stores(&config).await?;

    let (cache, cache_writer) = if config.cache_enabled {
        let client = db::create_redis_client(&config.redis_url)?;
        let (cache, handle) = Cache::new(client).await;
        tracing::info!("Redis cache enabled");
        (Some(cache), Some(handle))
    } else {
        tracing::info!("Redis cache disabled");
        (None, None)
    };

    if config.revalidate_url.is_some() {
        tracing::info!("Revalidation webhook enabled");
    }

    let state = AppState::new(
        menu_store,
        inventory_store,
        cache,
        StateOptions::from(&config),
    );
    let app = create_router(Arc::new(state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn build_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn MenuStore>, Arc<dyn InventoryStore>)> {
    match config.storage {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            if config.run_migrations {
                db::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");
            }
            let store = Arc::new(PgStore::new(pool));
            Ok((store.clone(), store))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
