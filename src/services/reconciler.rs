use crate::constants::{FINE_RETENTION_DAYS, MAX_INFLIGHT_REQUESTS};
use crate::error::Result;
use crate::models::{Candle, Granularity, Quote};
use crate::services::provider::MarketDataProvider;
use crate::services::store::TimeSeriesStore;
use crate::services::trading_hours::is_market_open;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// One symbol's failure within an ingestion cycle
#[derive(Debug, Clone)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Outcome of one batch ingestion cycle. Per-symbol failures never abort
/// sibling symbols; they are collected here and retried next cycle.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub updated: Vec<String>,
    pub failed: Vec<SymbolFailure>,
}

impl IngestReport {
    fn record_failure(&mut self, symbol: &str, error: impl ToString) {
        self.failed.push(SymbolFailure {
            symbol: symbol.to_string(),
            error: error.to_string(),
        });
    }
}

/// Tells the reconciler whether the market session is open right now.
/// Injectable so ingestion behavior is testable at a fixed session state.
pub type SessionSource = Arc<dyn Fn() -> bool + Send + Sync>;

/// Merges freshly fetched provider data into the store idempotently and
/// keeps the latest-price snapshots current.
pub struct IngestionReconciler {
    store: Arc<TimeSeriesStore>,
    provider: Arc<dyn MarketDataProvider>,
    inflight: Arc<Semaphore>,
    session: SessionSource,
}

impl IngestionReconciler {
    pub fn new(store: Arc<TimeSeriesStore>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            store,
            provider,
            inflight: Arc::new(Semaphore::new(MAX_INFLIGHT_REQUESTS)),
            session: Arc::new(is_market_open),
        }
    }

    /// Replace the wall-clock session check, e.g. to pin it in tests
    pub fn with_session_source(mut self, session: SessionSource) -> Self {
        self.session = session;
        self
    }

    /// Refresh latest prices for a batch of symbols.
    ///
    /// Two-tier fetch strategy: one batch call when the provider supports
    /// it, then a capped per-symbol fan-out for whatever the batch left
    /// unresolved. During the market session each fresh quote also lands as
    /// a synthetic fine-grained tick candle so intraday charts track the
    /// newest price between full candle fetches.
    pub async fn ingest_quotes(&self, symbols: &[String]) -> IngestReport {
        let mut report = IngestReport::default();
        if symbols.is_empty() {
            return report;
        }

        // Tier 1: batch fetch
        let mut quotes: HashMap<String, Quote> = HashMap::new();
        if self.provider.supports_batch_quotes() {
            match self.provider.fetch_quotes(symbols).await {
                Ok(batch) => quotes = batch,
                Err(e) => {
                    warn!(error = %e, "Batch quote fetch failed, falling back to per-symbol fetches");
                }
            }
        }

        // Tier 2: per-symbol fallback for symbols the batch did not resolve,
        // capped so we respect provider rate limits
        let missing: Vec<String> = symbols
            .iter()
            .filter(|s| !quotes.contains_key(*s))
            .cloned()
            .collect();

        if !missing.is_empty() {
            debug!(count = missing.len(), "Fetching unresolved symbols individually");
            let mut tasks: JoinSet<(String, Result<Option<Quote>>)> = JoinSet::new();

            for symbol in missing {
                // Semaphore is never closed, so acquisition only fails if the
                // runtime is shutting down
                let Ok(permit) = self.inflight.clone().acquire_owned().await else {
                    report.record_failure(&symbol, "ingestion shutting down");
                    continue;
                };
                let provider = self.provider.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    let result = provider.fetch_quote(&symbol).await;
                    (symbol, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((symbol, Ok(Some(quote)))) => {
                        quotes.insert(symbol, quote);
                    }
                    Ok((symbol, Ok(None))) => {
                        report.record_failure(&symbol, "provider returned no quote");
                    }
                    Ok((symbol, Err(e))) => {
                        report.record_failure(&symbol, e);
                    }
                    Err(e) => {
                        error!(error = %e, "Quote fetch task panicked");
                    }
                }
            }
        }

        // Persist in the caller's symbol order for stable reporting
        let market_open = (self.session)();
        for symbol in symbols {
            let Some(quote) = quotes.get(symbol) else {
                continue; // already recorded as failed above
            };
            match self.apply_quote(quote, market_open).await {
                Ok(()) => report.updated.push(symbol.clone()),
                Err(e) => report.record_failure(symbol, e),
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Quote ingestion cycle completed"
        );
        for failure in &report.failed {
            warn!(symbol = %failure.symbol, error = %failure.error, "Symbol failed this cycle");
        }

        report
    }

    async fn apply_quote(&self, quote: &Quote, market_open: bool) -> Result<()> {
        self.store
            .set_latest_price(
                &quote.symbol,
                quote.price,
                quote.change,
                quote.change_percent,
                quote.volume,
            )
            .await?;

        if market_open {
            let tick = Candle::from_tick(
                quote.symbol.clone(),
                Granularity::Fine.bucket_key(five_minute_bucket(Utc::now())),
                quote.price,
                quote.volume,
            );
            self.store.upsert_candles(Granularity::Fine, &[tick]).await?;
        }

        Ok(())
    }

    /// Fetch and persist historical candles for one symbol. Provider
    /// timestamps are normalized to the store's stable bucket-key format
    /// before the upsert. Returns the number of candles written.
    pub async fn ingest_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<usize> {
        let raw = self
            .provider
            .fetch_history(symbol, start, end, granularity.to_interval_string())
            .await?;

        let candles: Vec<Candle> = raw
            .into_iter()
            .map(|c| {
                Candle::new(
                    symbol.to_string(),
                    granularity.bucket_key(c.time),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume,
                )
            })
            .collect();

        let written = self.store.upsert_candles(granularity, &candles).await?;
        debug!(symbol, granularity = %granularity, written, "History ingested");
        Ok(written)
    }

    /// Backfill history for a batch of symbols over a trailing window,
    /// isolating per-symbol failures.
    pub async fn ingest_history_batch(
        &self,
        symbols: &[String],
        lookback_days: i64,
        granularity: Granularity,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let end = Utc::now().date_naive();
        let start = (Utc::now() - Duration::days(lookback_days)).date_naive();

        for symbol in symbols {
            match self.ingest_history(symbol, start, end, granularity).await {
                Ok(_) => report.updated.push(symbol.clone()),
                Err(e) => report.record_failure(symbol, e),
            }
        }

        report
    }

    /// Retention purge plus storage compaction. Runs off the hot path on
    /// its own schedule; failures are logged and never surface into
    /// ingestion. Returns the number of purged candles.
    pub async fn run_maintenance(&self) -> u64 {
        let purged = match self
            .store
            .purge_fine_grained_older_than(FINE_RETENTION_DAYS)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Retention purge failed");
                return 0;
            }
        };

        if let Err(e) = self.store.compact().await {
            error!(error = %e, "Store compaction failed");
        }

        purged
    }
}

/// Round a timestamp down to its 5-minute bucket boundary
fn five_minute_bucket(time: DateTime<Utc>) -> DateTime<Utc> {
    let minute = time.minute() - time.minute() % 5;
    Utc.with_ymd_and_hms(time.year(), time.month(), time.day(), time.hour(), minute, 0)
        .unwrap()
}
