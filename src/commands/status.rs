use crate::services::TimeSeriesStore;
use crate::utils::get_db_path;

/// Print store record counts and the latest price per tracked symbol
pub async fn run() {
    let db_path = get_db_path();
    if !db_path.exists() {
        println!("No database at {} - run `tickerboard pull` first", db_path.display());
        return;
    }

    let store = match TimeSeriesStore::new(db_path).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to open time-series store: {}", e);
            std::process::exit(1);
        }
    };

    match store.record_counts().await {
        Ok((fine, coarse, prices)) => {
            println!("📊 Store status:");
            println!("   ⏱️  Intraday candles: {}", fine);
            println!("   📅 Daily candles:    {}", coarse);
            println!("   💰 Tracked symbols:  {}", prices);
        }
        Err(e) => eprintln!("❌ Failed to read record counts: {}", e),
    }

    match store.get_all_latest_prices().await {
        Ok(prices) => {
            for price in prices {
                println!(
                    "   {:<8} {:>10.2} ({:+.2}, {:+.2}%) vol {}",
                    price.symbol, price.price, price.change, price.change_percent, price.volume
                );
            }
        }
        Err(e) => eprintln!("❌ Failed to read latest prices: {}", e),
    }

    store.close().await;
}
