use async_trait::async_trait;
use std::sync::Arc;
use tally_db::Database;
use tally_rates::{PriceCacheSink, PriceHistorySink};

/// Appends every refresh round to the price_history table
pub struct HistorySink {
    db: Arc<Database>,
}

impl HistorySink {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PriceHistorySink for HistorySink {
    async fn record_price(
        &self,
        asset_id: i64,
        price: f64,
        recorded_at: i64,
    ) -> anyhow::Result<()> {
        self.db.record_price(asset_id, price, recorded_at).await?;
        Ok(())
    }
}

/// Keeps the persistent price_cache table current so the next launch can
/// render values before the first network round completes
pub struct CacheSink {
    db: Arc<Database>,
}

impl CacheSink {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PriceCacheSink for CacheSink {
    async fn upsert_cached_price(
        &self,
        asset_id: i64,
        price: f64,
        updated_at: i64,
    ) -> anyhow::Result<()> {
        self.db.upsert_cached_price(asset_id, price, updated_at).await?;
        Ok(())
    }
}
