use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxtalk_api::{
    auth::{AuthProvider, HostedProvider, MockProvider},
    config::{AuthProviderKind, Config, StorageBackend},
    create_router,
    db::{create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgStore, Store},
    services::connectivity,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxtalk_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory store with the demo catalog");
            Arc::new(MemoryStore::with_demo_catalog()?)
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            tracing::info!("Connected to Postgres");
            Arc::new(PgStore::new(pool))
        }
    };

    let provider: Arc<dyn AuthProvider> = match config.auth_provider {
        AuthProviderKind::Mock => Arc::new(MockProvider::new()),
        AuthProviderKind::Hosted => {
            let url = config.backend_url.clone().context("BACKEND_URL is required")?;
            let key = config
                .backend_api_key
                .clone()
                .context("BACKEND_API_KEY is required")?;
            Arc::new(HostedProvider::new(url, key))
        }
    };

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            let (cache, writer) = Cache::new(client).await;
            tracing::info!("Catalog cache enabled");
            (Some(cache), Some(writer))
        }
        None => (None, None),
    };

    let probe = connectivity::spawn_probe(&config);

    let bind_address = config.bind_address();
    let state = AppState::new(config, store, provider, cache);

    let seeded = state.sessions.seed_profiles().await?;
    tracing::info!(
        provider = state.sessions.provider_name(),
        seeded_profiles = seeded,
        "Auth provider ready"
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server running on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(probe) = probe {
        probe.abort();
    }
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
