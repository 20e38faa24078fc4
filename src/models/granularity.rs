use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time resolution of stored candles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Sub-daily buckets (5-minute candles), bounded retention
    Fine,
    /// Daily buckets, retained indefinitely
    Coarse,
}

impl Granularity {
    /// SQLite table holding candles at this granularity
    pub fn table_name(&self) -> &'static str {
        match self {
            Granularity::Fine => "candles_intraday",
            Granularity::Coarse => "candles_daily",
        }
    }

    /// Format a timestamp as this granularity's bucket key
    pub fn bucket_key(&self, time: DateTime<Utc>) -> String {
        match self {
            Granularity::Fine => super::candle::intraday_bucket_key(time),
            Granularity::Coarse => super::candle::daily_bucket_key(time),
        }
    }

    /// Provider interval string for history fetches
    pub fn to_interval_string(&self) -> &'static str {
        match self {
            Granularity::Fine => "5m",
            Granularity::Coarse => "1D",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_interval_string())
    }
}
