use crate::errors::{DatabaseError, Result};
use crate::types::{Asset, AssetClass};
use crate::Database;
use rusqlite::{params, OptionalExtension};

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let class: String = row.get(3)?;
    Ok(Asset {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        class: AssetClass::from(class.as_str()),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const ASSET_COLUMNS: &str = "id, symbol, name, class, created_at, updated_at";

impl Database {
    /// Register an asset. Symbols are stored uppercase.
    pub async fn create_asset(&self, symbol: &str, name: &str, class: AssetClass) -> Result<Asset> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DatabaseError::InvalidData(
                "Asset symbol cannot be empty".to_string(),
            ));
        }

        let name = name.trim().to_string();
        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO assets (symbol, name, class, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                params![symbol, name, class.as_str(), now],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Asset {
                id,
                symbol,
                name,
                class,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// Get all assets, ordered by symbol
    pub async fn get_assets(&self) -> Result<Vec<Asset>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM assets ORDER BY symbol",
                ASSET_COLUMNS
            ))?;

            let assets = stmt
                .query_map([], asset_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(assets)
        })
        .await
    }

    /// Look up an asset by ticker symbol, case-insensitively
    pub async fn get_asset_by_symbol(&self, symbol: &str) -> Result<Option<Asset>> {
        let symbol = symbol.trim().to_uppercase();

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM assets WHERE symbol = ?1",
                ASSET_COLUMNS
            ))?;

            let asset = stmt.query_row([symbol], asset_from_row).optional()?;
            Ok(asset)
        })
        .await
    }

    /// Delete an asset; holdings and cached prices go with it
    pub async fn delete_asset(&self, id: i64) -> Result<()> {
        self.with_connection(move |conn| {
            let deleted = conn.execute("DELETE FROM assets WHERE id = ?1", [id])?;

            if deleted == 0 {
                return Err(DatabaseError::AssetNotFound(id));
            }

            log::info!("Deleted asset {}", id);
            Ok(())
        })
        .await
    }
}
