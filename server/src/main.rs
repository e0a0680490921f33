//! Markersync Server binary.

use markersync_engine::Reconciler;
use markersync_server::config::Config;
use markersync_server::feed::HttpFeed;
use markersync_server::sync::{spawn_scheduler, SyncService};
use markersync_server::websocket::ConnectionManager;
use markersync_server::{build_app, db, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "markersync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Markersync Server on {}:{}",
        config.host,
        config.port
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Build sync machinery
    let feed = HttpFeed::new(
        config.feed_url.clone(),
        config.connect_timeout,
        config.read_timeout,
    )?;
    let conn_manager = ConnectionManager::new_shared();
    let sync = SyncService::new_shared(
        pool.clone(),
        Arc::new(feed),
        Reconciler::new(config.absent_id_policy),
        conn_manager.clone(),
    );

    tracing::info!(
        feed = %config.feed_url,
        interval_secs = config.sync_interval.as_secs(),
        policy = %config.absent_id_policy,
        "Starting sync scheduler"
    );
    let scheduler = spawn_scheduler(sync.clone(), config.sync_interval);

    // Build application state
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        conn_manager,
        sync,
    };
    let app = build_app(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    scheduler.abort();

    Ok(())
}
