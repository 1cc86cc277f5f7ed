use crate::cache::RateCache;
use crate::crypto::CoinGeckoSource;
use crate::fiat::ExchangeRateSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How an asset gets priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Crypto,
    Fiat,
    Stock,
    Other,
}

/// The caller's view of an asset: its storage id, ticker and class.
/// The fetcher only reads the symbol and class and echoes the id back
/// in the result map.
#[derive(Debug, Clone)]
pub struct AssetRef {
    pub id: i64,
    pub symbol: String,
    pub class: AssetClass,
}

/// Append-only sink: one record per priced asset per refresh round
#[async_trait]
pub trait PriceHistorySink: Send + Sync {
    async fn record_price(&self, asset_id: i64, price: f64, recorded_at: i64)
        -> anyhow::Result<()>;
}

/// Latest-price sink: overwritten per asset on every refresh round
#[async_trait]
pub trait PriceCacheSink: Send + Sync {
    async fn upsert_cached_price(
        &self,
        asset_id: i64,
        price: f64,
        updated_at: i64,
    ) -> anyhow::Result<()>;
}

/// Best-effort price resolution across both rate sources.
///
/// Assets are partitioned by class and each partition routed to its source.
/// A failed source contributes nothing for its partition but never stops the
/// other one, so the caller always gets back whatever subset could be priced.
/// Assets with no price are absent from the map, except stock/other which are
/// pinned to zero until a source for them exists. No retries happen here;
/// the caller re-invokes on its own schedule.
pub struct RateFetcher {
    crypto: CoinGeckoSource,
    fiat: ExchangeRateSource,
    history_sink: Option<Arc<dyn PriceHistorySink>>,
    cache_sink: Option<Arc<dyn PriceCacheSink>>,
}

impl Default for RateFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RateFetcher {
    /// Fetcher against the production endpoints, with a cache shared by
    /// both sources and scoped to this instance
    pub fn new() -> Self {
        let cache = Arc::new(Mutex::new(RateCache::new()));
        Self {
            crypto: CoinGeckoSource::new(cache.clone()),
            fiat: ExchangeRateSource::new(cache),
            history_sink: None,
            cache_sink: None,
        }
    }

    /// Fetcher against custom endpoints, e.g. test stubs
    pub fn with_base_urls(crypto_base: &str, fiat_base: &str) -> Self {
        let cache = Arc::new(Mutex::new(RateCache::new()));
        Self {
            crypto: CoinGeckoSource::with_base_url(crypto_base, cache.clone()),
            fiat: ExchangeRateSource::with_base_url(fiat_base, cache),
            history_sink: None,
            cache_sink: None,
        }
    }

    /// Append every resolved price to a history log after each round
    pub fn with_history_sink(mut self, sink: Arc<dyn PriceHistorySink>) -> Self {
        self.history_sink = Some(sink);
        self
    }

    /// Upsert every resolved price into a persistent cache after each round
    pub fn with_cache_sink(mut self, sink: Arc<dyn PriceCacheSink>) -> Self {
        self.cache_sink = Some(sink);
        self
    }

    /// Resolve USD prices for a heterogeneous list of assets.
    ///
    /// The returned map only ever contains ids that were in the input;
    /// missing entries mean "price unknown this round".
    pub async fn fetch_prices(&self, assets: &[AssetRef]) -> HashMap<i64, f64> {
        let mut prices = HashMap::new();
        let mut crypto_assets = Vec::new();
        let mut fiat_assets = Vec::new();

        for asset in assets {
            match asset.class {
                AssetClass::Crypto => crypto_assets.push(asset),
                AssetClass::Fiat => fiat_assets.push(asset),
                // No pricing source for these yet; zero keeps them visible
                AssetClass::Stock | AssetClass::Other => {
                    prices.insert(asset.id, 0.0);
                }
            }
        }

        let crypto_prices = if crypto_assets.is_empty() {
            HashMap::new()
        } else {
            self.crypto.fetch(&symbols_of(&crypto_assets)).await
        };

        let fiat_prices = if fiat_assets.is_empty() {
            HashMap::new()
        } else {
            let result = self.fiat.fetch(&symbols_of(&fiat_assets)).await;
            if let Some(e) = result.error {
                // One bad round; fixed and cached rates still came through
                // and the next refresh will try the rest again
                log::warn!("Fiat rate fetch failed: {}", e);
            }
            result.prices
        };

        // Symbol is the join key, so every asset sharing a priced symbol
        // gets the same price
        let mut resolved = HashMap::new();
        for asset in crypto_assets {
            if let Some(&price) = crypto_prices.get(&asset.symbol.to_uppercase()) {
                resolved.insert(asset.id, price);
            }
        }
        for asset in fiat_assets {
            if let Some(&rate) = fiat_prices.get(&asset.symbol.to_uppercase()) {
                resolved.insert(asset.id, rate);
            }
        }

        self.push_to_sinks(&resolved, current_timestamp()).await;

        prices.extend(resolved);
        prices
    }

    /// Best-effort persistence of a round's resolved prices. Sink trouble is
    /// logged and ignored; the in-memory result is already final.
    async fn push_to_sinks(&self, resolved: &HashMap<i64, f64>, fetched_at: i64) {
        if let Some(sink) = &self.history_sink {
            for (&asset_id, &price) in resolved {
                if let Err(e) = sink.record_price(asset_id, price, fetched_at).await {
                    log::warn!("Could not record price history for asset {}: {}", asset_id, e);
                }
            }
        }
        if let Some(sink) = &self.cache_sink {
            for (&asset_id, &price) in resolved {
                if let Err(e) = sink.upsert_cached_price(asset_id, price, fetched_at).await {
                    log::warn!("Could not persist price for asset {}: {}", asset_id, e);
                }
            }
        }
    }
}

fn symbols_of(assets: &[&AssetRef]) -> Vec<String> {
    assets.iter().map(|asset| asset.symbol.clone()).collect()
}

fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
