use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tutorkb::config::AppConfig;
use tutorkb::db::{MemoryStore, NoteStore, PgNoteStore};
use tutorkb::embeddings::{Embedder, MockEmbedder, OpenAiEmbedder};
use tutorkb::services::{AppState, DisabledCompletion};
use tutorkb::services::{ingest::IngestService, search::SearchService};
use tutorkb::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = tutorkb::VERSION, "Starting tutorkb");

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {e}"))?;

    let store: Arc<dyn NoteStore> = if config.uses_memory_store() {
        tracing::info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgNoteStore::connect(&config.database).await?;
        store.ping().await?;
        tracing::info!("Connected to database");
        Arc::new(store)
    };

    let embedder: Arc<dyn Embedder> = if config.embedding.provider == "mock" {
        Arc::new(MockEmbedder::new(config.embedding.dimension))
    } else {
        Arc::new(OpenAiEmbedder::new(config.embedding.clone()))
    };

    let state = AppState {
        ingest_service: Arc::new(IngestService::new(store.clone(), embedder.clone())),
        search_service: Arc::new(SearchService::new(store, embedder)),
        completion: Arc::new(DisabledCompletion),
    };

    let app = routes::create_router(
        state,
        metrics_handle,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
