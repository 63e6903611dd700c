//! Threat Predictor Server
//!
//! Forecasts per-type security threat counts over a future horizon.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    THREAT PREDICTOR                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  POST /predict (Axum)                                       │
//! │        │                                                    │
//! │        ▼                                                    │
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │ Validate  │─▶│  Group    │─▶│  Forecast per type      │ │
//! │  │           │  │  by type  │  │  model │ mean fallback  │ │
//! │  └───────────┘  └───────────┘  └────────────┬────────────┘ │
//! │                                             ▼              │
//! │                              sort descending, respond       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod forecast;
mod handlers;
mod models;
mod pipeline;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config);

    tracing::info!("Threat Predictor starting...");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Forecast model: daily_seasonality={}, changepoints={}",
        config.forecast.daily_seasonality,
        config.forecast.n_changepoints
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Build application state
    let state = AppState {
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &config::Config) {
    let default_filter = if config.is_production() {
        "threat_predictor=info,tower_http=info"
    } else {
        "threat_predictor=debug,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Received shutdown signal");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    let routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict));

    with_middleware(routes, max_body_bytes).with_state(state)
}

/// Body limit, panic shield, compression, tracing and permissive CORS
fn with_middleware(routes: Router<AppState>, max_body_bytes: usize) -> Router<AppState> {
    routes
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
}
