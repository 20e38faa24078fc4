//! Tunables shared across the store, reconciler and workers.

/// Trailing retention window for fine-grained (5-minute) candles, in days.
/// Daily candles are kept indefinitely.
pub const FINE_RETENTION_DAYS: i64 = 30;

/// Candles per chunk when rolling 5-minute data up to 30-minute data
/// for the 5-day range.
pub const FIVE_DAY_GROUP_SIZE: usize = 6;

/// Hard timeout for a single provider request. A symbol whose fetch exceeds
/// this is marked failed for the cycle and retried on the next tick.
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Cap on simultaneous in-flight provider requests during fan-out ingestion
pub const MAX_INFLIGHT_REQUESTS: usize = 4;

/// Refresh worker period during market hours
pub const TRADING_REFRESH_SECS: u64 = 60;

/// Refresh worker period outside market hours
pub const NON_TRADING_REFRESH_SECS: u64 = 900;

/// Maintenance worker period (retention purge + compaction)
pub const MAINTENANCE_SECS: u64 = 6 * 60 * 60;

/// Default HTTP port for the serve command
pub const DEFAULT_PORT: u16 = 9876;
