pub mod maintenance_worker;
pub mod refresh_worker;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Liveness counters updated by the workers and reported by `/health`
#[derive(Debug, Default, Clone, Serialize)]
pub struct HealthStats {
    pub uptime_secs: u64,
    pub is_market_open: bool,
    pub refresh_iterations: u64,
    pub last_refresh: Option<String>,
    pub last_refresh_failures: usize,
    pub maintenance_iterations: u64,
    pub last_purged_candles: u64,
    pub fine_records: i64,
    pub coarse_records: i64,
    pub tracked_symbols: i64,
}

pub type SharedHealthStats = Arc<RwLock<HealthStats>>;
