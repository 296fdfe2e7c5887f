//! GeoSync Server
//!
//! An async Rust server that keeps a registry of geodata sources and
//! orchestrates their resynchronization, inline or through background
//! workers over NATS JetStream.

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geosync_drivers::create_default_registry;
use geosync_server::{
    config::{AppConfig, DatabaseConfig},
    db::{create_pool, DbPool},
    handlers,
    queue::{LocalTaskQueue, NatsTaskQueue, TaskQueue},
    refresh::RefreshRunner,
    services::{JobService, ResyncService, SourceService},
    state::AppState,
    sweep::start_sweep,
};

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,geosync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router with all routes.
fn build_router(
    state: AppState,
    db_pool: DbPool,
    source_service: SourceService,
    resync_service: ResyncService,
    job_service: JobService,
) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state);

    // Source registry routes
    let source_routes = Router::new()
        .route("/api/sources", post(handlers::sources::create))
        .route("/api/sources", get(handlers::sources::list))
        .route("/api/sources/{source}", get(handlers::sources::get))
        .route("/api/sources/{source}", patch(handlers::sources::update))
        .route("/api/sources/{source}", delete(handlers::sources::delete))
        .with_state(source_service);

    // Resync routes
    let resync_routes = Router::new()
        .route("/api/sources/resync-all", post(handlers::resync::resync_all))
        .route(
            "/api/sources/{source}/resync",
            post(handlers::resync::resync),
        )
        .with_state(resync_service);

    // Refresh job routes
    let jobs_routes = Router::new()
        .route("/api/jobs", get(handlers::jobs::list))
        .route("/api/jobs/{job_id}", get(handlers::jobs::get))
        .with_state(job_service.clone());

    // Worker event routes
    let events_routes = Router::new()
        .route("/api/events", post(handlers::handle_event))
        .with_state(job_service);

    // Database routes
    let database_routes = Router::new()
        .route("/api/db/init", post(handlers::database::init_database))
        .route(
            "/api/db/validate",
            get(handlers::database::validate_database),
        )
        .with_state(db_pool);

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .merge(source_routes)
        .merge(resync_routes)
        .merge(jobs_routes)
        .merge(events_routes)
        .merge(database_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Connect to NATS if configured.
async fn connect_nats(config: &AppConfig) -> Option<async_nats::Client> {
    if let Some(ref nats_url) = config.nats_url {
        match async_nats::connect(nats_url).await {
            Ok(client) => {
                tracing::info!(url = %nats_url, "Connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %nats_url, "Failed to connect to NATS, continuing without it");
                None
            }
        }
    } else {
        tracing::info!("NATS not configured, dispatching refreshes in-process");
        None
    }
}

/// Build the dispatch queue: NATS JetStream when available, otherwise
/// in-process.
async fn build_queue(
    nats_client: Option<async_nats::Client>,
    runner: Arc<RefreshRunner>,
) -> Arc<dyn TaskQueue> {
    if let Some(client) = nats_client {
        match NatsTaskQueue::new(Arc::new(client), runner.clone(), None, None).await {
            Ok(queue) => return Arc::new(queue),
            Err(e) => {
                tracing::warn!(error = %e, "JetStream setup failed, falling back to in-process dispatch");
            }
        }
    }

    Arc::new(LocalTaskQueue::new(runner))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting GeoSync Server"
    );

    // Load configuration
    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load database config, using defaults");
        DatabaseConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        debug = app_config.debug,
        "Configuration loaded"
    );

    // Create database connection pool
    let db_pool = create_pool(&db_config).await?;

    // Connect to NATS (optional)
    let nats_client = connect_nats(&app_config).await;

    // Inline and local refreshes run on the server process itself
    let registry = Arc::new(create_default_registry());
    let runner = Arc::new(RefreshRunner::new(
        db_pool.clone(),
        registry,
        format!("{}-inline", app_config.server_name),
    ));

    let queue = build_queue(nats_client, runner).await;

    // Create services
    let source_service = SourceService::new(db_pool.clone());
    let job_service = JobService::new(db_pool.clone());
    let resync_service = ResyncService::new(db_pool.clone(), queue.clone(), app_config.public_url());

    // Periodic refresh sweep
    if app_config.disable_refresh_sweep {
        tracing::info!("Refresh sweep disabled");
    } else {
        start_sweep(
            db_pool.clone(),
            resync_service.clone(),
            Duration::from_secs(app_config.refresh_sweep_interval),
        );
        tracing::info!(
            interval_seconds = app_config.refresh_sweep_interval,
            "Refresh sweep started"
        );
    }

    // Create application state
    let state = AppState::new(db_pool.clone(), app_config.clone(), queue);

    // Build the router
    let app = build_router(
        state,
        db_pool,
        source_service,
        resync_service,
        job_service,
    );

    // Bind to address
    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
