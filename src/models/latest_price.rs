use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest observed price snapshot for a symbol.
///
/// One record per symbol, overwritten in place on every successful fetch.
/// Never versioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestPrice {
    pub symbol: String,

    /// Last traded price
    pub price: f64,

    /// Absolute change since previous close
    pub change: f64,

    /// Percentage change since previous close
    pub change_percent: f64,

    /// Cumulative session volume
    pub volume: u64,

    /// When this snapshot was taken
    pub observed_at: DateTime<Utc>,
}
