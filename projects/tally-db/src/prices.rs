use crate::errors::Result;
use crate::types::{CachedPrice, PricePoint};
use crate::Database;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

impl Database {
    // ========== Price Cache Methods ==========

    /// Upsert the latest known USD price for an asset
    pub async fn upsert_cached_price(&self, asset_id: i64, price_usd: f64, updated_at: i64) -> Result<()> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO price_cache (asset_id, price_usd, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(asset_id) DO UPDATE SET price_usd = excluded.price_usd, updated_at = excluded.updated_at",
                params![asset_id, price_usd, updated_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Upsert a whole refresh round of prices in one transaction
    pub async fn upsert_cached_prices(&self, prices: &HashMap<i64, f64>) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }

        let now = Self::current_timestamp();
        let prices = prices.clone();

        self.transaction(move |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO price_cache (asset_id, price_usd, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(asset_id) DO UPDATE SET price_usd = excluded.price_usd, updated_at = excluded.updated_at",
            )?;
            for (asset_id, price) in &prices {
                stmt.execute(params![asset_id, price, now])?;
            }
            Ok(())
        })
        .await
    }

    /// Get the cached price row for one asset
    pub async fn get_cached_price(&self, asset_id: i64) -> Result<Option<CachedPrice>> {
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare("SELECT asset_id, price_usd, updated_at FROM price_cache WHERE asset_id = ?1")?;

            let cached = stmt
                .query_row([asset_id], |row| {
                    Ok(CachedPrice {
                        asset_id: row.get(0)?,
                        price_usd: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                })
                .optional()?;
            Ok(cached)
        })
        .await
    }

    /// Map of asset id to last known USD price. Empty map when nothing is cached.
    pub async fn cached_price_map(&self) -> Result<HashMap<i64, f64>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT asset_id, price_usd FROM price_cache")?;

            let mut prices = HashMap::new();
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?;
            for row in rows {
                let (asset_id, price) = row?;
                prices.insert(asset_id, price);
            }

            Ok(prices)
        })
        .await
    }

    /// When any cached price was last written, if ever
    pub async fn last_price_update(&self) -> Result<Option<i64>> {
        self.with_connection(|conn| {
            let last: Option<i64> =
                conn.query_row("SELECT MAX(updated_at) FROM price_cache", [], |row| row.get(0))?;
            Ok(last)
        })
        .await
    }

    // ========== Price History Methods ==========

    /// Append one price observation to the history log
    pub async fn record_price(&self, asset_id: i64, price_usd: f64, recorded_at: i64) -> Result<()> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO price_history (asset_id, price_usd, recorded_at) VALUES (?1, ?2, ?3)",
                params![asset_id, price_usd, recorded_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent observations for one asset, newest first
    pub async fn price_history(&self, asset_id: i64, limit: u32) -> Result<Vec<PricePoint>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, asset_id, price_usd, recorded_at FROM price_history
                 WHERE asset_id = ?1 ORDER BY recorded_at DESC LIMIT ?2",
            )?;

            let points = stmt
                .query_map(params![asset_id, limit], point_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(points)
        })
        .await
    }

    /// Observations for one asset inside a time window, oldest first
    pub async fn price_history_range(
        &self,
        asset_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let (from, to) = (from.timestamp(), to.timestamp());

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, asset_id, price_usd, recorded_at FROM price_history
                 WHERE asset_id = ?1 AND recorded_at BETWEEN ?2 AND ?3 ORDER BY recorded_at ASC",
            )?;

            let points = stmt
                .query_map(params![asset_id, from, to], point_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(points)
        })
        .await
    }
}

fn point_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PricePoint> {
    Ok(PricePoint {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        price_usd: row.get(2)?,
        recorded_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetClass;
    use chrono::TimeZone;

    async fn seed_asset(db: &Database, symbol: &str) -> i64 {
        db.create_asset(symbol, symbol, AssetClass::Crypto)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_upsert_overwrites_price() {
        let db = Database::new_in_memory().await.unwrap();
        let btc = seed_asset(&db, "BTC").await;

        db.upsert_cached_price(btc, 50000.0, 100).await.unwrap();
        let cached = db.get_cached_price(btc).await.unwrap().unwrap();
        assert_eq!(cached.price_usd, 50000.0);
        assert_eq!(cached.updated_at, 100);

        db.upsert_cached_price(btc, 51000.0, 200).await.unwrap();
        let cached = db.get_cached_price(btc).await.unwrap().unwrap();
        assert_eq!(cached.price_usd, 51000.0);
        assert_eq!(cached.updated_at, 200);
    }

    #[tokio::test]
    async fn test_cached_price_map_batch() {
        let db = Database::new_in_memory().await.unwrap();
        let btc = seed_asset(&db, "BTC").await;
        let eth = seed_asset(&db, "ETH").await;

        let mut prices = HashMap::new();
        prices.insert(btc, 50000.0);
        prices.insert(eth, 3000.0);
        db.upsert_cached_prices(&prices).await.unwrap();

        let map = db.cached_price_map().await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&btc], 50000.0);
        assert_eq!(map[&eth], 3000.0);

        assert!(db.last_price_update().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_cache_queries() {
        let db = Database::new_in_memory().await.unwrap();

        assert!(db.cached_price_map().await.unwrap().is_empty());
        assert_eq!(db.last_price_update().await.unwrap(), None);
        assert!(db.get_cached_price(999).await.unwrap().is_none());

        // Batch upsert of nothing is a no-op
        db.upsert_cached_prices(&HashMap::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_price_history_ordering_and_limit() {
        let db = Database::new_in_memory().await.unwrap();
        let btc = seed_asset(&db, "BTC").await;

        for (i, price) in [44000.0, 45000.0, 46000.0].iter().enumerate() {
            db.record_price(btc, *price, 1000 + i as i64).await.unwrap();
        }

        let recent = db.price_history(btc, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].price_usd, 46000.0);
        assert_eq!(recent[1].price_usd, 45000.0);
    }

    #[tokio::test]
    async fn test_price_history_range() {
        let db = Database::new_in_memory().await.unwrap();
        let btc = seed_asset(&db, "BTC").await;

        db.record_price(btc, 100.0, 1000).await.unwrap();
        db.record_price(btc, 200.0, 2000).await.unwrap();
        db.record_price(btc, 300.0, 3000).await.unwrap();

        let from = Utc.timestamp_opt(1500, 0).unwrap();
        let to = Utc.timestamp_opt(2500, 0).unwrap();
        let window = db.price_history_range(btc, from, to).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].price_usd, 200.0);
    }
}
