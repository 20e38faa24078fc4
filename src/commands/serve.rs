use crate::services::{HttpProvider, IngestionReconciler, TaskRegistry, TimeSeriesStore};
use crate::utils::{get_db_path, get_provider_base_url, get_watchlist};
use crate::worker::{self, HealthStats};
use crate::{server, worker::SharedHealthStats};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

pub async fn run(port: u16) {
    println!("🚀 Starting tickerboard server on port {}", port);

    let db_path = get_db_path();
    println!("📁 Database: {}", db_path.display());

    let store = match TimeSeriesStore::new(db_path).await {
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

    let watchlist = get_watchlist();
    println!("📈 Watchlist: {}", watchlist.join(", "));

    match store.record_counts().await {
        Ok((fine, coarse, prices)) => {
            println!("✅ Store opened:");
            println!("   ⏱️  Intraday candles: {}", fine);
            println!("   📅 Daily candles:    {}", coarse);
            println!("   💰 Latest prices:    {}", prices);
        }
        Err(e) => {
            eprintln!("⚠️  Warning: failed to read record counts: {}", e);
        }
    }

    let reconciler = Arc::new(IngestionReconciler::new(store.clone(), provider));
    let health_stats: SharedHealthStats = Arc::new(RwLock::new(HealthStats::default()));

    // Background workers go through the task registry so they stay
    // cancellable instead of owning the process lifecycle
    let registry = Arc::new(TaskRegistry::new());
    worker::refresh_worker::register(
        &registry,
        reconciler.clone(),
        watchlist,
        health_stats.clone(),
    )
    .await;
    worker::maintenance_worker::register(&registry, reconciler, health_stats.clone()).await;

    // Uptime tracker
    let start_time = Instant::now();
    let uptime_health_stats = health_stats.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            let mut health = uptime_health_stats.write().await;
            health.uptime_secs = start_time.elapsed().as_secs();
        }
    });

    println!("🌐 Starting HTTP server...");
    if let Err(e) = server::serve(store, health_stats, port).await {
        eprintln!("❌ Server error: {}", e);
        registry.stop_all().await;
        std::process::exit(1);
    }
}
