use crate::cache::{RateCache, FIAT_TTL};
use crate::errors::{RateError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const EXCHANGE_RATE_API: &str = "https://api.exchangerate-api.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// AED is pegged at 3.6725 AED per USD
const AED_PEG: f64 = 3.6725;

/// The upstream publishes the full rate table relative to USD in one response
#[derive(Debug, Deserialize)]
struct RateTable {
    rates: HashMap<String, f64>,
}

/// What one fiat round produced: every rate that could be resolved, plus the
/// error that cut the round short, if any. Fixed and still-fresh cached rates
/// are present even when the network trip failed.
#[derive(Debug, Default)]
pub struct PartitionResult {
    pub prices: HashMap<String, f64>,
    pub error: Option<RateError>,
}

/// Fiat rates via the ExchangeRate-API `latest/USD` table.
///
/// The upstream quotes "units of target currency per 1 USD"; the cache and
/// the returned map hold the inverse, the USD cost of one unit. Unlike the
/// crypto path there is no per-entry structure to degrade from, so a failed
/// round carries an explicit error alongside whatever rates never needed
/// the network.
pub struct ExchangeRateSource {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<Mutex<RateCache>>,
}

impl ExchangeRateSource {
    pub fn new(cache: Arc<Mutex<RateCache>>) -> Self {
        Self::with_base_url(EXCHANGE_RATE_API, cache)
    }

    /// Point the source at a different endpoint, e.g. a test stub
    pub fn with_base_url(base_url: impl Into<String>, cache: Arc<Mutex<RateCache>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache,
        }
    }

    /// Resolve a batch of currency codes to USD rates.
    ///
    /// USD itself and pegged currencies resolve from constants without any
    /// network traffic; everything else is served from cache while fresh.
    /// A single request covers all misses because the upstream has no
    /// batching parameter, it always returns the complete table.
    pub async fn fetch(&self, symbols: &[String]) -> PartitionResult {
        let mut prices = HashMap::new();
        let mut wanted = Vec::new();

        {
            let mut cache = self.cache.lock().await;
            for symbol in symbols {
                let symbol = symbol.to_uppercase();
                match symbol.as_str() {
                    // USD is the unit of account
                    "USD" => {
                        prices.insert(symbol, 1.0);
                    }
                    "AED" => {
                        let rate = 1.0 / AED_PEG;
                        cache.store(&symbol, rate);
                        prices.insert(symbol, rate);
                    }
                    _ => {
                        if let Some(rate) = cache.fresh(&symbol, FIAT_TTL) {
                            prices.insert(symbol, rate);
                        } else {
                            wanted.push(symbol);
                        }
                    }
                }
            }
        }

        if wanted.is_empty() {
            return PartitionResult {
                prices,
                error: None,
            };
        }

        let table = match self.fetch_table().await {
            Ok(table) => table,
            Err(e) => {
                return PartitionResult {
                    prices,
                    error: Some(e),
                }
            }
        };

        let mut cache = self.cache.lock().await;
        for symbol in wanted {
            if let Some(&upstream) = table.rates.get(&symbol) {
                if upstream > 0.0 {
                    let rate = 1.0 / upstream;
                    cache.store(&symbol, rate);
                    prices.insert(symbol, rate);
                } else {
                    log::debug!("Skipping non-positive upstream rate for {}", symbol);
                }
            }
        }

        PartitionResult {
            prices,
            error: None,
        }
    }

    async fn fetch_table(&self) -> Result<RateTable> {
        let url = format!("{}/v4/latest/USD", self.base_url);
        let response = self.client.get(&url).timeout(HTTP_TIMEOUT).send().await?;

        if !response.status().is_success() {
            return Err(RateError::UpstreamStatus(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| RateError::Decode(e.to_string()))
    }
}
