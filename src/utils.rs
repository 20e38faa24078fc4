use std::path::PathBuf;

/// SQLite database path from environment variable or default
pub fn get_db_path() -> PathBuf {
    std::env::var("TICKERBOARD_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/tickerboard.db"))
}

/// Symbols to refresh, comma-separated in `TICKERBOARD_SYMBOLS`
pub fn get_watchlist() -> Vec<String> {
    std::env::var("TICKERBOARD_SYMBOLS")
        .unwrap_or_else(|_| "AAPL,MSFT,GOOG".to_string())
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Base URL of the market-data provider API
pub fn get_provider_base_url() -> String {
    std::env::var("TICKERBOARD_PROVIDER_URL")
        .unwrap_or_else(|_| "https://query1.finance.example.com".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_default_is_nonempty() {
        // Only meaningful when the env var is unset, which is the test default
        if std::env::var("TICKERBOARD_SYMBOLS").is_err() {
            assert!(!get_watchlist().is_empty());
        }
    }
}
