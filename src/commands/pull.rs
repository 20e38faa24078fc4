use crate::models::Granularity;
use crate::services::{HttpProvider, IngestionReconciler, TimeSeriesStore};
use crate::utils::{get_db_path, get_provider_base_url, get_watchlist};
use std::sync::Arc;

/// One-shot ingestion for the watchlist: daily history backfill plus a
/// latest-quote refresh. Per-symbol failures are printed, not fatal.
pub async fn run(days: i64) {
    let watchlist = get_watchlist();
    println!(
        "⬇️  Pulling {} days of history for {} symbols...",
        days,
        watchlist.len()
    );

    let store = match TimeSeriesStore::new(get_db_path()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("❌ Failed to open time-series store: {}", e);
            std::process::exit(1);
        }
    };

    let provider = match HttpProvider::new(get_provider_base_url()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            eprintln!("❌ Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    let reconciler = IngestionReconciler::new(store.clone(), provider);

    let history = reconciler
        .ingest_history_batch(&watchlist, days, Granularity::Coarse)
        .await;
    println!(
        "📅 History: {} symbols updated, {} failed",
        history.updated.len(),
        history.failed.len()
    );

    let quotes = reconciler.ingest_quotes(&watchlist).await;
    println!(
        "💰 Quotes:  {} symbols updated, {} failed",
        quotes.updated.len(),
        quotes.failed.len()
    );

    for failure in history.failed.iter().chain(quotes.failed.iter()) {
        eprintln!("   ⚠️  {}: {}", failure.symbol, failure.error);
    }

    store.close().await;
}
