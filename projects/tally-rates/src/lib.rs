pub mod cache;
pub mod crypto;
pub mod errors;
pub mod fetcher;
pub mod fiat;

// Re-export the main surface
pub use cache::{CachedRate, RateCache, CRYPTO_TTL, FIAT_TTL};
pub use crypto::CoinGeckoSource;
pub use errors::RateError;
pub use fetcher::{AssetClass, AssetRef, PriceCacheSink, PriceHistorySink, RateFetcher};
pub use fiat::{ExchangeRateSource, PartitionResult};
