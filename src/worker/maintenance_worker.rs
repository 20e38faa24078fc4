use crate::constants::MAINTENANCE_SECS;
use crate::services::{IngestionReconciler, TaskRegistry};
use crate::worker::SharedHealthStats;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// One maintenance cycle: retention purge plus storage compaction.
/// Failures are contained inside the reconciler and never reach ingestion.
#[instrument(skip(reconciler, health_stats))]
pub async fn run_cycle(reconciler: &IngestionReconciler, health_stats: &SharedHealthStats) {
    let purged = reconciler.run_maintenance().await;

    let mut health = health_stats.write().await;
    health.maintenance_iterations += 1;
    health.last_purged_candles = purged;

    info!(purged, "Maintenance cycle completed");
}

pub async fn register(
    registry: &TaskRegistry,
    reconciler: Arc<IngestionReconciler>,
    health_stats: SharedHealthStats,
) {
    registry
        .register(
            "maintenance",
            Duration::from_secs(MAINTENANCE_SECS),
            move || {
                let reconciler = reconciler.clone();
                let health_stats = health_stats.clone();
                async move {
                    run_cycle(&reconciler, &health_stats).await;
                }
            },
        )
        .await;
}
