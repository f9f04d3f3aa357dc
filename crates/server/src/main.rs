use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use episodecast_core::{
    load_config, validate_config, DescriptorStore, FeedSyncEngine, FsDescriptorStore,
    HttpDescriptorFetcher, HttpFeedSource, SeriesCatalog, SqliteSeriesStore, SqliteSnapshotStore,
    SqliteSubscriberFeedStore, SqliteSubscriberStore, SubscriberFeedMaintainer, SubscriberStore,
    SyncComponents, SyncScheduler, TorrentPersonalizer,
};
use episodecast_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("EPISODECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        database = ?config.database.path,
        descriptors = ?config.storage.descriptor_dir,
        "Configuration loaded successfully"
    );

    // Stores
    let db_path = &config.database.path;
    let series_store = Arc::new(
        SqliteSeriesStore::new(db_path).context("Failed to create series store")?,
    );
    let subscribers: Arc<dyn SubscriberStore> = Arc::new(
        SqliteSubscriberStore::new(db_path).context("Failed to create subscriber store")?,
    );
    let snapshots = Arc::new(
        SqliteSnapshotStore::new(db_path).context("Failed to create snapshot store")?,
    );
    let feed_store = Arc::new(
        SqliteSubscriberFeedStore::new(db_path).context("Failed to create feed store")?,
    );
    let descriptors: Arc<dyn DescriptorStore> =
        Arc::new(FsDescriptorStore::new(&config.storage.descriptor_dir));
    info!("Stores initialized");

    let catalog =
        Arc::new(SeriesCatalog::load(series_store).context("Failed to load series catalog")?);
    let feeds = Arc::new(SubscriberFeedMaintainer::new(
        feed_store,
        Arc::clone(&descriptors),
        config.sync.feed_limit,
    ));

    // Upstream clients
    let source = Arc::new(
        HttpFeedSource::new(&config.upstream).context("Failed to create feed client")?,
    );
    let fetcher = Arc::new(
        HttpDescriptorFetcher::new(&config.upstream)
            .context("Failed to create descriptor client")?,
    );

    let components = SyncComponents {
        source,
        snapshots,
        catalog: Arc::clone(&catalog),
        fetcher,
        descriptors: Arc::clone(&descriptors),
        subscribers: Arc::clone(&subscribers),
        feeds: Arc::clone(&feeds),
        personalizer: TorrentPersonalizer::new(config.trackers.announce.clone()),
    };
    let engine = Arc::new(FeedSyncEngine::new(
        components,
        &config.sync,
        config.server.public_url.clone(),
    ));

    let mut state = AppState::new(
        config.clone(),
        Arc::clone(&engine),
        catalog,
        subscribers,
        feeds,
        descriptors,
    );

    // Start scheduler if enabled
    let scheduler = if config.sync.enabled {
        let scheduler = Arc::new(SyncScheduler::new(Arc::clone(&engine), &config.sync));
        scheduler.start();
        info!(interval_secs = config.sync.interval_secs, "Sync scheduler started");
        state = state.with_scheduler(Arc::clone(&scheduler));
        Some(scheduler)
    } else {
        info!("Sync scheduler disabled in config");
        None
    };

    // Create router
    let app = create_router(Arc::new(state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(scheduler) = scheduler {
        scheduler.stop();
        info!("Sync scheduler stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
