use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use board::config::{Config, StateBackend};
use board::persistence::{FileStore, KvStore, MemoryStore, RedisStore};
use board::ranking_client::HttpRankingClient;
use board::routes::build_router;
use board::state::AppState;
use board::sync::{ScoringPoller, Workspace};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting board sync v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    let client = HttpRankingClient::new(&config.backend_url, config.request_timeout)
        .context("Invalid BACKEND_URL")?;
    info!("Ranking backend: {}", client.base_url());

    let workspace = Arc::new(Workspace::new(
        Arc::new(client),
        store,
        config.request_timeout,
    ));

    // The daemon still serves cached state and retries on the next sync.
    if let Err(e) = workspace.resync().await {
        warn!("Initial sync failed: {e}");
    }

    let poller = ScoringPoller::new(workspace.clone(), config.poll_interval).spawn();

    let state = AppState {
        workspace,
        config: config.clone(),
    };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    poller.stop().await;
    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config.state_backend {
        StateBackend::Memory => {
            info!("Board preferences kept in memory");
            Arc::new(MemoryStore::new())
        }
        StateBackend::File => {
            info!("Board preferences stored in {}", config.state_path.display());
            Arc::new(FileStore::open(&config.state_path).await?)
        }
        StateBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis state backend")?;
            info!("Board preferences stored in Redis");
            Arc::new(RedisStore::connect(url).await?)
        }
    };
    Ok(store)
}
