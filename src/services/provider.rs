use crate::constants::PROVIDER_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::models::{ProviderCandle, Quote};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Black-box market-data source.
///
/// All calls are best-effort per symbol: a batch fetch may omit symbols it
/// could not resolve, and a single-symbol fetch may return `Ok(None)` when
/// the provider has nothing for it. Neither aborts a batch ingestion cycle.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the live quote for one symbol, `None` if the provider has none
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>>;

    /// Fetch live quotes for a batch of symbols; absent symbols are simply
    /// missing from the map, not errors
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>>;

    /// Fetch historical candles for a symbol over `[start, end]` at the
    /// given provider interval (e.g. "5m", "1D")
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<ProviderCandle>>;

    /// Whether a single batch-quote call is supported. When false the
    /// reconciler fans out per-symbol fetches instead.
    fn supports_batch_quotes(&self) -> bool {
        true
    }
}

/// HTTP implementation of [`MarketDataProvider`].
///
/// Every request is bounded by a hard client timeout; a symbol whose fetch
/// times out is reported failed for the cycle and picked up again on the
/// next scheduled tick.
pub struct HttpProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(base_url: String) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid provider base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        info!("Created HttpProvider: base_url='{}'", base_url);

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl MarketDataProvider for HttpProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let url = format!("{}/quote?symbol={}", self.base_url, symbol);
        debug!(symbol, "Fetching quote");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(symbol, "Provider has no quote");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Quote request for {} failed with status {}",
                symbol,
                response.status()
            )));
        }

        let quote: Quote = response.json().await?;
        Ok(Some(quote))
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/quotes?symbols={}", self.base_url, symbols.join(","));
        debug!(count = symbols.len(), "Fetching quote batch");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Batch quote request failed with status {}",
                response.status()
            )));
        }

        let quotes: Vec<Quote> = response.json().await?;
        let found = quotes.len();
        if found < symbols.len() {
            warn!(
                requested = symbols.len(),
                found, "Batch quote response is missing symbols"
            );
        }

        Ok(quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect())
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<ProviderCandle>> {
        let url = format!(
            "{}/history?symbol={}&start={}&end={}&interval={}",
            self.base_url, symbol, start, end, interval
        );
        debug!(symbol, interval, "Fetching history");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "History request for {} failed with status {}",
                symbol,
                response.status()
            )));
        }

        let candles: Vec<ProviderCandle> = response.json().await?;
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(HttpProvider::new("ftp://example.com".to_string()).is_err());
        assert!(HttpProvider::new("example.com".to_string()).is_err());
    }

    #[test]
    fn test_trims_trailing_slash() {
        let provider = HttpProvider::new("https://example.com/".to_string()).unwrap();
        assert_eq!(provider.base_url, "https://example.com");
    }
}
