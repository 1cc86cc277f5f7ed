use crate::cache::{RateCache, CRYPTO_TTL};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko id for each supported ticker. Symbols outside this table are
/// dropped from the batch rather than sent upstream.
static COINGECKO_IDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("USDT", "tether"),
        ("USDC", "usd-coin"),
        ("BNB", "binancecoin"),
        ("XRP", "ripple"),
        ("SOL", "solana"),
        ("ADA", "cardano"),
        ("DOGE", "dogecoin"),
        ("DOT", "polkadot"),
        ("MATIC", "matic-network"),
        ("AVAX", "avalanche-2"),
    ])
});

/// Crypto quotes via CoinGecko's `/simple/price` batch endpoint.
///
/// One outbound request per batch of cache misses. Network trouble, bad
/// statuses and undecodable bodies all degrade to "no prices this round";
/// they are logged here and never surfaced to the caller.
pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<Mutex<RateCache>>,
}

impl CoinGeckoSource {
    pub fn new(cache: Arc<Mutex<RateCache>>) -> Self {
        Self::with_base_url(COINGECKO_API, cache)
    }

    /// Point the source at a different endpoint, e.g. a test stub
    pub fn with_base_url(base_url: impl Into<String>, cache: Arc<Mutex<RateCache>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache,
        }
    }

    /// Resolve a batch of ticker symbols to USD prices.
    ///
    /// Fresh cache entries are served without a network call; the rest are
    /// merged into a single upstream request. Unknown symbols and symbols the
    /// upstream fails to price are simply absent from the result.
    pub async fn fetch(&self, symbols: &[String]) -> HashMap<String, f64> {
        let mut prices = HashMap::new();
        let mut ids: Vec<&'static str> = Vec::new();
        let mut id_to_symbol: HashMap<&'static str, String> = HashMap::new();

        {
            let cache = self.cache.lock().await;
            for symbol in symbols {
                let symbol = symbol.to_uppercase();
                if let Some(price) = cache.fresh(&symbol, CRYPTO_TTL) {
                    prices.insert(symbol, price);
                    continue;
                }
                if let Some(&id) = COINGECKO_IDS.get(symbol.as_str()) {
                    if id_to_symbol.insert(id, symbol).is_none() {
                        ids.push(id);
                    }
                }
            }
        }

        if ids.is_empty() {
            return prices;
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );

        let response = match self.client.get(&url).timeout(HTTP_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Crypto price request failed: {}", e);
                return prices;
            }
        };

        if !response.status().is_success() {
            log::warn!(
                "Crypto price endpoint returned status {}",
                response.status()
            );
            return prices;
        }

        // Each entry looks like {"bitcoin": {"usd": 45000.0}}, but the usd
        // field can also carry an error string when the upstream is degraded
        let body: HashMap<String, HashMap<String, serde_json::Value>> =
            match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("Could not decode crypto price response: {}", e);
                    return prices;
                }
            };

        let mut cache = self.cache.lock().await;
        for (id, fields) in body {
            let symbol = match id_to_symbol.get(id.as_str()) {
                Some(symbol) => symbol,
                None => continue,
            };
            match fields.get("usd").and_then(|value| value.as_f64()) {
                Some(price) => {
                    cache.store(symbol, price);
                    prices.insert(symbol.clone(), price);
                }
                None => {
                    log::debug!("Skipping non-numeric price for {}", symbol);
                }
            }
        }

        prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn source_for(server: &mockito::ServerGuard) -> (CoinGeckoSource, Arc<Mutex<RateCache>>) {
        let cache = Arc::new(Mutex::new(RateCache::new()));
        (
            CoinGeckoSource::with_base_url(server.url(), cache.clone()),
            cache,
        )
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batches_into_one_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "bitcoin,ethereum,solana".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
            ]))
            .with_body(r#"{"bitcoin":{"usd":45000.0},"ethereum":{"usd":3000.0},"solana":{"usd":150.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let (source, cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC", "ETH", "SOL"])).await;

        mock.assert_async().await;
        assert_eq!(prices.len(), 3);
        assert_eq!(prices["BTC"], 45000.0);
        assert_eq!(prices["ETH"], 3000.0);
        assert_eq!(prices["SOL"], 150.0);

        // Every accepted price landed in the cache
        assert_eq!(cache.lock().await.fresh("BTC", CRYPTO_TTL), Some(45000.0));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_body(r#"{"bitcoin":{"usd":45000.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let first = source.fetch(&symbols(&["BTC"])).await;
        let second = source.fetch(&symbols(&["BTC"])).await;

        mock.assert_async().await;
        assert_eq!(first["BTC"], second["BTC"]);
    }

    #[tokio::test]
    async fn test_stale_entry_refetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_body(r#"{"bitcoin":{"usd":46000.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let (source, cache) = source_for(&server);
        {
            let mut cache = cache.lock().await;
            cache.store("BTC", 45000.0);
            cache.backdate("BTC", CRYPTO_TTL + Duration::from_secs(1));
        }

        let prices = source.fetch(&symbols(&["BTC"])).await;

        mock.assert_async().await;
        assert_eq!(prices["BTC"], 46000.0);
        // The observation time was refreshed along with the price
        assert_eq!(cache.lock().await.fresh("BTC", CRYPTO_TTL), Some(46000.0));
    }

    #[tokio::test]
    async fn test_unknown_symbol_never_fetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["FAKECOIN"])).await;

        mock.assert_async().await;
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_symbol_dropped_from_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "bitcoin".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
            ]))
            .with_body(r#"{"bitcoin":{"usd":45000.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC", "FAKECOIN"])).await;

        mock.assert_async().await;
        assert_eq!(prices.len(), 1);
        assert!(!prices.contains_key("FAKECOIN"));
    }

    #[tokio::test]
    async fn test_non_numeric_price_skips_only_that_symbol() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_body(r#"{"bitcoin":{"usd":45000.0},"ethereum":{"usd":"rate limited"}}"#)
            .create_async()
            .await;

        let (source, cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC", "ETH"])).await;

        assert_eq!(prices.len(), 1);
        assert_eq!(prices["BTC"], 45000.0);
        // The bad entry was not cached either
        assert!(cache.lock().await.get("ETH").is_none());
    }

    #[tokio::test]
    async fn test_error_status_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC"])).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_body("not json at all")
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC"])).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_symbols_collapse_into_one_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "bitcoin".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
            ]))
            .with_body(r#"{"bitcoin":{"usd":45000.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let (source, _cache) = source_for(&server);
        let prices = source.fetch(&symbols(&["BTC", "btc"])).await;

        mock.assert_async().await;
        assert_eq!(prices["BTC"], 45000.0);
    }
}
