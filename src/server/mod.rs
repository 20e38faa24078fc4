pub mod api;

use crate::services::TimeSeriesStore;
use crate::worker::SharedHealthStats;
use axum::{extract::FromRef, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TimeSeriesStore>,
    pub health_stats: SharedHealthStats,
}

impl FromRef<AppState> for Arc<TimeSeriesStore> {
    fn from_ref(app_state: &AppState) -> Arc<TimeSeriesStore> {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for SharedHealthStats {
    fn from_ref(app_state: &AppState) -> SharedHealthStats {
        app_state.health_stats.clone()
    }
}

/// Start the axum server
pub async fn serve(
    store: Arc<TimeSeriesStore>,
    health_stats: SharedHealthStats,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = AppState {
        store,
        health_stats,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    tracing::info!("Registering routes:");
    tracing::info!("  GET /chart?symbol=AAPL&range=1-month");
    tracing::info!("  GET /prices");
    tracing::info!("  GET /health");

    let app = Router::new()
        .route("/chart", get(api::get_chart_handler))
        .route("/prices", get(api::get_prices_handler))
        .route("/health", get(api::health_handler))
        .layer(cors)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
