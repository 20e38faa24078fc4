use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live quote as returned by the market-data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub volume: u64,
}

/// Historical candle as returned by the provider, prior to bucket-key
/// normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCandle {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}
