//! PaperPulse API Gateway
//!
//! The HTTP surface of the pipeline.
//! Handles:
//! - Ingestion triggers (direct and scheduled)
//! - Paper, summary, search and trend reads
//! - Rate limiting
//! - Observability (logging, metrics, health)

mod handlers;
mod middleware;

use axum::{
    extract::{FromRef, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use paperpulse_common::{
    config::AppConfig,
    db::{DbPool, PaperStore, Repository, Storage},
    errors::AppError,
    metrics,
};
use paperpulse_ingestion::{ArxivClient, FeedClient, IngestionJob};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Storage>,
    pub ingestion: Arc<IngestionJob>,
    pub http: reqwest::Client,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new<S>(
        config: Arc<AppConfig>,
        store: Arc<S>,
        feed: Arc<dyn FeedClient>,
        metrics: Option<PrometheusHandle>,
    ) -> Self
    where
        S: Storage + 'static,
    {
        let paper_store: Arc<dyn PaperStore> = store.clone();
        let ingestion = IngestionJob::new(feed, paper_store, &config);

        Self {
            config,
            store,
            ingestion: Arc::new(ingestion),
            http: reqwest::Client::new(),
            metrics,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    info!("Starting PaperPulse API Gateway v{}", paperpulse_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        Some(install_metrics()?)
    } else {
        None
    };

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let store = Arc::new(Repository::new(db.clone()));
    let feed = Arc::new(ArxivClient::new(&config.feed)?);

    // Create app state
    let state = AppState::new(config.clone(), store, feed, metrics_handle);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_ingestion_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::INGESTION_BUCKETS,
        )?
        .install_recorder()?;

    metrics::register_metrics();
    Ok(handle)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut api_routes = Router::new()
        .route("/ingest", post(handlers::ingest::ingest))
        .route("/papers", get(handlers::papers::list_papers))
        .route("/papers/{id}/summary", get(handlers::papers::get_summary))
        .route("/search", get(handlers::search::search))
        .route("/trends", get(handlers::trends::list_trends))
        .route("/stats", get(handlers::stats::stats))
        .route("/cron", get(handlers::cron::cron));

    if state.config.rate_limit.enabled {
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            RateLimitState::new(&state.config.rate_limit),
            rate_limit_middleware,
        ));
    }

    Router::new()
        // Health endpoints (never rate limited)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(render_metrics))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(
            state.config.server.max_concurrent_requests.max(1),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Prometheus text exposition
async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let handle = state.metrics.as_ref().ok_or_else(|| AppError::NotFound {
        resource_type: "endpoint".to_string(),
        id: "/metrics".to_string(),
    })?;

    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], handle.render()))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
