use crate::error::AppError;
use crate::server::AppState;
use crate::services::RangeResolver;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

/// Query parameters for the /chart endpoint
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub symbol: String,

    /// Range token: intraday, 5-day, 1-month, 6-month, 1-year, 5-year.
    /// Anything else serves the full daily history.
    #[serde(default = "default_range")]
    pub range: String,
}

fn default_range() -> String {
    "1-month".to_string()
}

/// GET /chart - resolve a range token into a chart-ready OHLCV series
///
/// Examples:
/// - /chart?symbol=AAPL (defaults to 1-month)
/// - /chart?symbol=AAPL&range=intraday
/// - /chart?symbol=BRK.B&range=5-year
#[instrument(skip(app_state))]
pub async fn get_chart_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> Response {
    debug!(symbol = %params.symbol, range = %params.range, "Chart request");

    let resolver = RangeResolver::new(app_state.store.clone());
    match resolver.get_chart_data(&params.symbol, &params.range).await {
        Ok(chart) => Json(chart).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /prices - latest price snapshot for every tracked symbol
#[instrument(skip(app_state))]
pub async fn get_prices_handler(State(app_state): State<AppState>) -> Response {
    match app_state.store.get_all_latest_prices().await {
        Ok(prices) => Json(prices).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health - worker liveness plus store record counts
#[instrument(skip(app_state))]
pub async fn health_handler(State(app_state): State<AppState>) -> Response {
    let mut health = app_state.health_stats.read().await.clone();

    match app_state.store.record_counts().await {
        Ok((fine, coarse, prices)) => {
            health.fine_records = fine;
            health.coarse_records = coarse;
            health.tracked_symbols = prices;
        }
        Err(e) => {
            warn!(error = %e, "Failed to read record counts for health report");
        }
    }

    Json(health).into_response()
}

fn error_response(error: AppError) -> Response {
    let status = match &error {
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = %status, error = %error, "Request failed");
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
