use crate::error::{AppError, Result};
use crate::models::{daily_bucket_key, Aggregation, ChartData, RangePlan, RangeToken};
use crate::services::aggregator::Aggregator;
use crate::services::store::{SortOrder, TimeSeriesStore};
use crate::services::trading_hours::market_day_start_utc;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// Resolves a symbolic range token into a concrete store query plus an
/// optional aggregation pass, and returns the chart-ready series.
///
/// Stateless per call and strictly read-only against the store, so calls are
/// safe to run concurrently with each other and with ingestion.
pub struct RangeResolver {
    store: Arc<TimeSeriesStore>,
}

impl RangeResolver {
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Resolve `(symbol, range)` into an ascending OHLCV series.
    ///
    /// Unknown range tokens fall back to the full unwindowed coarse history;
    /// a symbol with no stored data yields an empty series. Neither is an
    /// error. Malformed symbols are rejected before any storage read.
    pub async fn get_chart_data(&self, symbol: &str, range: &str) -> Result<ChartData> {
        let symbol = validate_symbol(symbol)?;

        let plan = match RangeToken::parse(range) {
            Some(token) => token.plan(),
            None => {
                debug!(range, "Unrecognized range token, serving raw coarse history");
                RangePlan::fallback()
            }
        };

        let from_bucket = plan.lookback_days.map(|days| {
            if days == 0 {
                // Intraday: today's candles, bounded at the market-timezone
                // midnight so prior-evening UTC buckets stay out
                plan.granularity.bucket_key(market_day_start_utc())
            } else {
                daily_bucket_key(Utc::now() - Duration::days(days))
            }
        });

        let candles = self
            .store
            .query_candles(
                plan.granularity,
                &symbol,
                from_bucket.as_deref(),
                None,
                SortOrder::Ascending,
            )
            .await?;

        let data = match plan.aggregation {
            Aggregation::None => candles,
            Aggregation::ByCount(group_size) => Aggregator::aggregate_by_count(candles, group_size),
            Aggregation::IsoWeek => Aggregator::aggregate_by_iso_week(candles),
        };

        Ok(ChartData {
            symbol,
            range: range.to_string(),
            count: data.len(),
            data,
        })
    }
}

/// Uppercase and check a client-supplied symbol before it reaches storage
fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.len() > 12 {
        return Err(AppError::Validation(format!(
            "Invalid symbol: '{}'",
            symbol
        )));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(AppError::Validation(format!(
            "Invalid symbol: '{}'",
            symbol
        )));
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, Granularity};
    use tempfile::tempdir;

    async fn seeded_resolver() -> (tempfile::TempDir, Arc<TimeSeriesStore>, RangeResolver) {
        let temp_dir = tempdir().unwrap();
        let store = Arc::new(
            TimeSeriesStore::new(temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let resolver = RangeResolver::new(store.clone());
        (temp_dir, store, resolver)
    }

    fn daily_candle(symbol: &str, date: &str, close: f64) -> Candle {
        Candle::new(
            symbol.to_string(),
            date.to_string(),
            close - 1.0,
            close + 1.0,
            close - 2.0,
            close,
            1_000,
        )
    }

    #[test]
    fn test_symbol_validation() {
        assert_eq!(validate_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(validate_symbol("BRK.B").unwrap(), "BRK.B");
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("AAPL; DROP TABLE").is_err());
        assert!(validate_symbol("WAYTOOLONGSYMBOL").is_err());
    }

    #[tokio::test]
    async fn test_one_month_returns_recent_dailies_unaggregated() {
        let (_dir, store, resolver) = seeded_resolver().await;

        // Five daily candles over the last week, well inside the window
        let candles: Vec<Candle> = (1..=5)
            .map(|days_ago| {
                let date = daily_bucket_key(Utc::now() - Duration::days(days_ago));
                daily_candle("AAPL", &date, 180.0 + days_ago as f64)
            })
            .collect();
        store
            .upsert_candles(Granularity::Coarse, &candles)
            .await
            .unwrap();

        let chart = resolver.get_chart_data("AAPL", "1-month").await.unwrap();
        assert_eq!(chart.count, 5);
        assert_eq!(chart.data.len(), 5);
        // Ascending by date
        for pair in chart.data.windows(2) {
            assert!(pair[0].bucket_key < pair[1].bucket_key);
        }
        store.close().await;
    }

    #[tokio::test]
    async fn test_one_month_excludes_old_candles() {
        let (_dir, store, resolver) = seeded_resolver().await;

        let old_date = daily_bucket_key(Utc::now() - Duration::days(90));
        let recent_date = daily_bucket_key(Utc::now() - Duration::days(3));
        store
            .upsert_candles(
                Granularity::Coarse,
                &[
                    daily_candle("AAPL", &old_date, 150.0),
                    daily_candle("AAPL", &recent_date, 185.0),
                ],
            )
            .await
            .unwrap();

        let chart = resolver.get_chart_data("AAPL", "1-month").await.unwrap();
        assert_eq!(chart.count, 1);
        assert_eq!(chart.data[0].bucket_key, recent_date);
        store.close().await;
    }

    #[tokio::test]
    async fn test_unknown_token_falls_back_to_full_history() {
        let (_dir, store, resolver) = seeded_resolver().await;

        // One candle far outside any trailing window
        let old_date = daily_bucket_key(Utc::now() - Duration::days(3000));
        store
            .upsert_candles(Granularity::Coarse, &[daily_candle("AAPL", &old_date, 50.0)])
            .await
            .unwrap();

        let chart = resolver.get_chart_data("AAPL", "10-year").await.unwrap();
        assert_eq!(chart.count, 1);
        assert_eq!(chart.range, "10-year");
        store.close().await;
    }

    #[tokio::test]
    async fn test_no_data_is_empty_series_not_error() {
        let (_dir, store, resolver) = seeded_resolver().await;

        let chart = resolver.get_chart_data("NFLX", "1-year").await.unwrap();
        assert_eq!(chart.count, 0);
        assert!(chart.data.is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn test_five_day_aggregates_fine_candles() {
        let (_dir, store, resolver) = seeded_resolver().await;

        // Twelve 5-minute candles from earlier today (kept within the
        // trailing 5-day window regardless of current time)
        let base = Utc::now() - Duration::hours(2);
        let candles: Vec<Candle> = (0..12)
            .map(|i| {
                let time = base + Duration::minutes(i * 5);
                Candle::new(
                    "AAPL".to_string(),
                    Granularity::Fine.bucket_key(time),
                    100.0 + i as f64,
                    101.0 + i as f64,
                    99.0 + i as f64,
                    100.5 + i as f64,
                    1_000,
                )
            })
            .collect();
        store
            .upsert_candles(Granularity::Fine, &candles)
            .await
            .unwrap();

        let chart = resolver.get_chart_data("AAPL", "5-day").await.unwrap();
        assert_eq!(chart.count, 2); // 12 five-minute candles -> 2 half-hour candles
        assert_eq!(chart.data[0].volume, 6_000);
        store.close().await;
    }

    #[tokio::test]
    async fn test_intraday_excludes_previous_market_evening() {
        let (_dir, store, resolver) = seeded_resolver().await;

        // One candle a minute before the market-timezone midnight (an
        // early-UTC bucket from the previous NY evening), one after it
        let day_start = market_day_start_utc();
        let before = Granularity::Fine.bucket_key(day_start - Duration::minutes(1));
        let after = Granularity::Fine.bucket_key(day_start + Duration::minutes(5));
        store
            .upsert_candles(
                Granularity::Fine,
                &[
                    Candle::from_tick("AAPL".into(), before, 180.0, 100),
                    Candle::from_tick("AAPL".into(), after.clone(), 181.0, 100),
                ],
            )
            .await
            .unwrap();

        let chart = resolver.get_chart_data("AAPL", "intraday").await.unwrap();
        assert_eq!(chart.count, 1);
        assert_eq!(chart.data[0].bucket_key, after);
        store.close().await;
    }

    #[tokio::test]
    async fn test_rejects_malformed_symbol_before_storage() {
        let (_dir, store, resolver) = seeded_resolver().await;

        let err = resolver.get_chart_data("", "1-month").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        store.close().await;
    }
}
