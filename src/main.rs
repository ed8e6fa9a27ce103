use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snake_arena_server::config::{ServerConfig, StoreKind};
use snake_arena_server::game::clock::SystemClock;
use snake_arena_server::game::engine::{run_ticker, Engine};
use snake_arena_server::metrics::Metrics;
use snake_arena_server::net::http::{router, AppState};
use snake_arena_server::store::{MemoryStore, WorldStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Snake Arena Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, store={:?}, server_tick={}",
        config.bind_address, config.port, config.store, config.server_tick
    );

    let store = open_store(&config.store)?;
    let metrics = Arc::new(Metrics::new());
    let engine = Arc::new(Engine::new(
        store,
        Arc::new(SystemClock),
        config.world,
        metrics,
    ));
    let world = engine.config()?;
    info!(
        "World ready: {}x{} grid, tick {}ms, target bots {}",
        world.grid_width, world.grid_height, world.tick_ms, world.target_bots
    );

    if config.server_tick {
        info!("Server-side ticking enabled");
        tokio::spawn(run_ticker(engine.clone()));
    }

    let app = router(AppState {
        engine,
        metrics_enabled: config.metrics_enabled,
    });

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server ready on http://{}", addr);

    // Shutdown signal handler
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

fn open_store(kind: &StoreKind) -> anyhow::Result<Arc<dyn WorldStore>> {
    match kind {
        StoreKind::Memory => {
            info!("Using in-memory world store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let store = snake_arena_server::store::SqliteStore::open(path)?;
            info!("Using SQLite world store at {}", path.display());
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreKind::Sqlite(path) => {
            tracing::warn!(
                "Built without the sqlite feature, ignoring {} and using memory",
                path.display()
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
