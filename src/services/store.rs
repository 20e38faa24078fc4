use crate::error::{AppError, Result};
use crate::models::{daily_bucket_key, Candle, Granularity, LatestPrice};
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::PathBuf;
use tracing::{debug, info};

/// Query order for candle reads. Charts want ascending; "latest N" listings
/// want descending. Both are cheap against the `(symbol, bucket_key)` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// SQLite-backed time-series storage: two candle tables partitioned by
/// granularity plus one latest-price snapshot table.
///
/// Constructed explicitly and passed in wherever storage is needed, so tests
/// can run against isolated temporary databases.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    pool: SqlitePool,
    database_path: PathBuf,
}

impl TimeSeriesStore {
    /// Open (or create) the database and run schema setup
    pub async fn new(database_path: PathBuf) -> Result<Self> {
        info!("Initializing time-series store at: {:?}", database_path);

        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal) // concurrent readers during writes
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Incremental);

        let pool = SqlitePool::connect_with(connect_options).await?;

        let store = Self {
            pool,
            database_path,
        };
        store.initialize_schema().await?;

        info!("Time-series store initialized");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        for granularity in [Granularity::Fine, Granularity::Coarse] {
            let table = granularity.table_name();

            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    symbol TEXT NOT NULL,
                    bucket_key TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (symbol, bucket_key)
                )
                "#
            ))
            .execute(&self.pool)
            .await?;

            // Descending scans for "latest N" listings
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_recent ON {table}(symbol, bucket_key DESC)"
            ))
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS latest_prices (
                symbol TEXT PRIMARY KEY,
                price REAL NOT NULL,
                change REAL NOT NULL,
                change_percent REAL NOT NULL,
                volume INTEGER NOT NULL,
                observed_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Idempotent bulk upsert: each candle replaces any existing record with
    /// the same `(symbol, bucket_key)`. Runs in one transaction so the batch
    /// is atomic. Returns the number of rows written.
    pub async fn upsert_candles(&self, granularity: Granularity, candles: &[Candle]) -> Result<usize> {
        if candles.is_empty() {
            return Ok(0);
        }

        let table = granularity.table_name();
        let query = format!(
            r#"
            INSERT OR REPLACE INTO {table}
            (symbol, bucket_key, open, high, low, close, volume)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#
        );

        let mut transaction = self.pool.begin().await?;
        let mut affected = 0;

        for candle in candles {
            let result = sqlx::query(&query)
                .bind(&candle.symbol)
                .bind(&candle.bucket_key)
                .bind(candle.open)
                .bind(candle.high)
                .bind(candle.low)
                .bind(candle.close)
                .bind(candle.volume as i64)
                .execute(&mut *transaction)
                .await?;
            affected += result.rows_affected() as usize;
        }

        transaction.commit().await?;

        debug!(
            granularity = %granularity,
            candles = candles.len(),
            affected,
            "Upserted candle batch"
        );
        Ok(affected)
    }

    /// Range scan over one symbol's candles, bounded by optional bucket keys
    /// (inclusive on both ends), in the caller's requested order.
    pub async fn query_candles(
        &self,
        granularity: Granularity,
        symbol: &str,
        from_bucket: Option<&str>,
        to_bucket: Option<&str>,
        order: SortOrder,
    ) -> Result<Vec<Candle>> {
        let table = granularity.table_name();
        let mut query = format!(
            "SELECT symbol, bucket_key, open, high, low, close, volume \
             FROM {table} WHERE symbol = ?1"
        );
        if from_bucket.is_some() {
            query.push_str(" AND bucket_key >= ?2");
        }
        if to_bucket.is_some() {
            // Placeholder index depends on whether a lower bound is present
            query.push_str(if from_bucket.is_some() {
                " AND bucket_key <= ?3"
            } else {
                " AND bucket_key <= ?2"
            });
        }
        query.push_str(&format!(" ORDER BY bucket_key {}", order.sql()));

        let mut q = sqlx::query(&query).bind(symbol);
        if let Some(from) = from_bucket {
            q = q.bind(from);
        }
        if let Some(to) = to_bucket {
            q = q.bind(to);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_candle).collect()
    }

    /// Upsert the latest-price snapshot for a symbol, always overwriting
    pub async fn set_latest_price(
        &self,
        symbol: &str,
        price: f64,
        change: f64,
        change_percent: f64,
        volume: u64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO latest_prices
            (symbol, price, change, change_percent, volume, observed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(symbol)
        .bind(price)
        .bind(change)
        .bind(change_percent)
        .bind(volume as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_latest_price(&self, symbol: &str) -> Result<Option<LatestPrice>> {
        let row = sqlx::query(
            "SELECT symbol, price, change, change_percent, volume, observed_at \
             FROM latest_prices WHERE symbol = ?1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_latest_price).transpose()
    }

    pub async fn get_all_latest_prices(&self) -> Result<Vec<LatestPrice>> {
        let rows = sqlx::query(
            "SELECT symbol, price, change, change_percent, volume, observed_at \
             FROM latest_prices ORDER BY symbol ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_latest_price).collect()
    }

    /// Delete fine-grained candles whose bucket key predates
    /// `now - retention_days`. Returns the number of rows removed.
    pub async fn purge_fine_grained_older_than(&self, retention_days: i64) -> Result<u64> {
        let cutoff = daily_bucket_key(Utc::now() - Duration::days(retention_days));
        let table = Granularity::Fine.table_name();

        let result = sqlx::query(&format!("DELETE FROM {table} WHERE bucket_key < ?1"))
            .bind(&cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!(cutoff = %cutoff, deleted, "Purged aged-out intraday candles");
        Ok(deleted)
    }

    /// Reclaim space freed by the retention purge. Maintenance only, never
    /// called on the read/write hot path.
    pub async fn compact(&self) -> Result<()> {
        for pragma in ["PRAGMA incremental_vacuum", "PRAGMA wal_checkpoint(TRUNCATE)", "PRAGMA optimize"] {
            sqlx::query(pragma).execute(&self.pool).await?;
        }
        debug!("Store compaction completed");
        Ok(())
    }

    /// Record counts per table: (fine, coarse, latest prices)
    pub async fn record_counts(&self) -> Result<(i64, i64, i64)> {
        let fine: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candles_intraday")
            .fetch_one(&self.pool)
            .await?;
        let coarse: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candles_daily")
            .fetch_one(&self.pool)
            .await?;
        let prices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM latest_prices")
            .fetch_one(&self.pool)
            .await?;
        Ok((fine, coarse, prices))
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.database_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Time-series store connection pool closed");
    }
}

fn row_to_candle(row: sqlx::sqlite::SqliteRow) -> Result<Candle> {
    Ok(Candle {
        symbol: row.try_get("symbol").map_err(storage_err)?,
        bucket_key: row.try_get("bucket_key").map_err(storage_err)?,
        open: row.try_get("open").map_err(storage_err)?,
        high: row.try_get("high").map_err(storage_err)?,
        low: row.try_get("low").map_err(storage_err)?,
        close: row.try_get("close").map_err(storage_err)?,
        volume: row.try_get::<i64, _>("volume").map_err(storage_err)? as u64,
    })
}

fn row_to_latest_price(row: sqlx::sqlite::SqliteRow) -> Result<LatestPrice> {
    Ok(LatestPrice {
        symbol: row.try_get("symbol").map_err(storage_err)?,
        price: row.try_get("price").map_err(storage_err)?,
        change: row.try_get("change").map_err(storage_err)?,
        change_percent: row.try_get("change_percent").map_err(storage_err)?,
        volume: row.try_get::<i64, _>("volume").map_err(storage_err)? as u64,
        observed_at: row
            .try_get::<DateTime<Utc>, _>("observed_at")
            .map_err(storage_err)?,
    })
}

fn storage_err(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store() -> (tempfile::TempDir, TimeSeriesStore) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let store = TimeSeriesStore::new(db_path).await.unwrap();
        (temp_dir, store)
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

    #[tokio::test]
    async fn test_store_creation() {
        let (_dir, store) = test_store().await;
        assert!(store.database_path().exists());
        store.close().await;
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (_dir, store) = test_store().await;
        let candles = vec![daily_candle("AAPL", "2024-01-02", 185.0)];

        store
            .upsert_candles(Granularity::Coarse, &candles)
            .await
            .unwrap();
        store
            .upsert_candles(Granularity::Coarse, &candles)
            .await
            .unwrap();

        let stored = store
            .query_candles(Granularity::Coarse, "AAPL", None, None, SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].close, 185.0);
        store.close().await;
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_identity() {
        let (_dir, store) = test_store().await;

        store
            .upsert_candles(Granularity::Coarse, &[daily_candle("AAPL", "2024-01-02", 185.0)])
            .await
            .unwrap();
        store
            .upsert_candles(Granularity::Coarse, &[daily_candle("AAPL", "2024-01-02", 186.5)])
            .await
            .unwrap();

        let stored = store
            .query_candles(Granularity::Coarse, "AAPL", None, None, SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].close, 186.5);
        store.close().await;
    }

    #[tokio::test]
    async fn test_query_respects_bounds_and_order() {
        let (_dir, store) = test_store().await;
        let candles: Vec<Candle> = ["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
            .iter()
            .enumerate()
            .map(|(i, d)| daily_candle("MSFT", d, 400.0 + i as f64))
            .collect();
        store
            .upsert_candles(Granularity::Coarse, &candles)
            .await
            .unwrap();

        let window = store
            .query_candles(
                Granularity::Coarse,
                "MSFT",
                Some("2024-01-03"),
                Some("2024-01-04"),
                SortOrder::Ascending,
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].bucket_key, "2024-01-03");

        let latest_first = store
            .query_candles(Granularity::Coarse, "MSFT", None, None, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(latest_first[0].bucket_key, "2024-01-05");
        store.close().await;
    }

    #[tokio::test]
    async fn test_latest_price_overwrites() {
        let (_dir, store) = test_store().await;

        store
            .set_latest_price("AAPL", 185.0, 1.2, 0.65, 50_000_000)
            .await
            .unwrap();
        store
            .set_latest_price("AAPL", 186.0, 2.2, 1.20, 51_000_000)
            .await
            .unwrap();

        let latest = store.get_latest_price("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.price, 186.0);
        assert_eq!(latest.volume, 51_000_000);

        let all = store.get_all_latest_prices().await.unwrap();
        assert_eq!(all.len(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn test_retention_purge_counts_and_keeps_recent() {
        let (_dir, store) = test_store().await;
        let now = Utc::now();

        // Fine candles spanning the last 40 days, one per day
        let candles: Vec<Candle> = (0..40)
            .map(|days_ago| {
                let time = now - Duration::days(days_ago);
                Candle::from_tick(
                    "AAPL".to_string(),
                    Granularity::Fine.bucket_key(time),
                    100.0,
                    500,
                )
            })
            .collect();
        store
            .upsert_candles(Granularity::Fine, &candles)
            .await
            .unwrap();

        let deleted = store.purge_fine_grained_older_than(30).await.unwrap();
        assert_eq!(deleted, 9); // days 31..=39 predate the cutoff day

        let remaining = store
            .query_candles(Granularity::Fine, "AAPL", None, None, SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 31);

        store.compact().await.unwrap();
        store.close().await;
    }
}
