use crate::constants::{NON_TRADING_REFRESH_SECS, TRADING_REFRESH_SECS};
use crate::models::Granularity;
use crate::services::{get_refresh_interval, is_market_open, IngestionReconciler, TaskRegistry};
use crate::worker::SharedHealthStats;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Interval ticks carry scheduling jitter, so a cycle counts as due slightly
/// before its nominal period elapses
const TICK_JITTER_GRACE: Duration = Duration::from_secs(1);

/// One refresh cycle: pull quotes for the watchlist, top up recent daily
/// candles, and during the market session top up today's intraday candles.
#[instrument(skip(reconciler, health_stats))]
pub async fn run_cycle(
    reconciler: &IngestionReconciler,
    symbols: &[String],
    health_stats: &SharedHealthStats,
) {
    let loop_start = std::time::Instant::now();
    let market_open = is_market_open();

    let quote_report = reconciler.ingest_quotes(symbols).await;

    // Keep the trailing week of daily candles current; idempotent upserts
    // make the overlap with already-stored days harmless
    let history_report = reconciler
        .ingest_history_batch(symbols, 7, Granularity::Coarse)
        .await;

    let mut failures = quote_report.failed.len() + history_report.failed.len();

    if market_open {
        let intraday_report = reconciler
            .ingest_history_batch(symbols, 1, Granularity::Fine)
            .await;
        failures += intraday_report.failed.len();
    }

    if failures > 0 {
        warn!(failures, "Refresh cycle completed with per-symbol failures");
    }

    {
        let mut health = health_stats.write().await;
        health.refresh_iterations += 1;
        health.last_refresh = Some(Utc::now().to_rfc3339());
        health.last_refresh_failures = failures;
        health.is_market_open = market_open;
    }

    info!(
        duration_secs = loop_start.elapsed().as_secs_f64(),
        market_open, "Refresh cycle completed"
    );
}

/// Whether enough time has passed since the last cycle for the currently
/// desired period. A cycle that has never run is always due.
fn is_due(elapsed_since_last: Option<Duration>, desired: Duration) -> bool {
    match elapsed_since_last {
        None => true,
        Some(elapsed) => elapsed + TICK_JITTER_GRACE >= desired,
    }
}

/// Register the refresh worker with the task registry.
///
/// The registry ticks at the fast trading-hours period; each tick re-reads
/// the session state and skips the cycle until the desired period (fast in
/// session, relaxed outside it) has elapsed. That way a server started
/// overnight tightens to the trading cadence as soon as the market opens,
/// while the task itself stays cancellable through the registry.
pub async fn register(
    registry: &TaskRegistry,
    reconciler: Arc<IngestionReconciler>,
    symbols: Vec<String>,
    health_stats: SharedHealthStats,
) {
    let last_run: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

    registry
        .register(
            "refresh",
            Duration::from_secs(TRADING_REFRESH_SECS),
            move || {
                let reconciler = reconciler.clone();
                let symbols = symbols.clone();
                let health_stats = health_stats.clone();
                let last_run = last_run.clone();
                async move {
                    let desired = get_refresh_interval(
                        Duration::from_secs(TRADING_REFRESH_SECS),
                        Duration::from_secs(NON_TRADING_REFRESH_SECS),
                    );

                    let mut last = last_run.lock().await;
                    if !is_due(last.map(|t| t.elapsed()), desired) {
                        debug!(
                            desired_secs = desired.as_secs(),
                            "Refresh not due yet, skipping tick"
                        );
                        return;
                    }
                    *last = Some(Instant::now());
                    drop(last);

                    run_cycle(&reconciler, &symbols, &health_stats).await;
                }
            },
        )
        .await;
}
