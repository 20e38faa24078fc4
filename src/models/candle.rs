use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV record for a time bucket.
///
/// Identity is `(symbol, bucket_key)`: upserting the same identity replaces
/// the prior record. Bucket keys are stable UTC strings so lexicographic
/// order matches chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Ticker symbol
    pub symbol: String,

    /// Bucket identity: `YYYY-MM-DD` (daily) or `YYYY-MM-DD HH:MM:SS` (intraday)
    pub bucket_key: String,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Trading volume
    pub volume: u64,
}

impl Candle {
    pub fn new(
        symbol: String,
        bucket_key: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            symbol,
            bucket_key,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Build a flat candle from a single quote observation
    /// (open = high = low = close = price).
    pub fn from_tick(symbol: String, bucket_key: String, price: f64, volume: u64) -> Self {
        Self {
            symbol,
            bucket_key,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// Parse the calendar date out of the bucket key (first 10 chars)
    pub fn date(&self) -> Option<chrono::NaiveDate> {
        self.bucket_key
            .get(..10)
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Format a timestamp as an intraday bucket key (`YYYY-MM-DD HH:MM:SS`, UTC)
pub fn intraday_bucket_key(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a timestamp as a daily bucket key (`YYYY-MM-DD`, UTC)
pub fn daily_bucket_key(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_key_formats() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 14, 35, 0).unwrap();
        assert_eq!(intraday_bucket_key(time), "2024-03-05 14:35:00");
        assert_eq!(daily_bucket_key(time), "2024-03-05");
    }

    #[test]
    fn test_candle_date_from_either_granularity() {
        let daily = Candle::new("AAPL".into(), "2024-03-05".into(), 1.0, 2.0, 0.5, 1.5, 100);
        let fine = Candle::new(
            "AAPL".into(),
            "2024-03-05 14:35:00".into(),
            1.0,
            2.0,
            0.5,
            1.5,
            100,
        );
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(daily.date(), Some(expected));
        assert_eq!(fine.date(), Some(expected));
    }

    #[test]
    fn test_from_tick_is_flat() {
        let c = Candle::from_tick("MSFT".into(), "2024-03-05 14:35:00".into(), 410.25, 1200);
        assert_eq!(c.open, 410.25);
        assert_eq!(c.high, 410.25);
        assert_eq!(c.low, 410.25);
        assert_eq!(c.close, 410.25);
    }
}
