use crate::errors::{DatabaseError, Result};
use crate::types::{AssetClass, Holding, HoldingDetail};
use crate::Database;
use rusqlite::{params, OptionalExtension};

fn detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HoldingDetail> {
    let class: String = row.get(5)?;
    Ok(HoldingDetail {
        id: row.get(0)?,
        account_id: row.get(1)?,
        account_name: row.get(2)?,
        asset_id: row.get(3)?,
        asset_symbol: row.get(4)?,
        asset_class: AssetClass::from(class.as_str()),
        amount: row.get(6)?,
        purchase_price: row.get(7)?,
        purchase_date: row.get(8)?,
    })
}

const DETAIL_QUERY: &str = "SELECT h.id, h.account_id, a.name, h.asset_id, s.symbol, s.class,
        h.amount, h.purchase_price, h.purchase_date
 FROM holdings h
 JOIN accounts a ON a.id = h.account_id
 JOIN assets s ON s.id = h.asset_id";

impl Database {
    /// Record a holding of an asset in an account
    pub async fn create_holding(
        &self,
        account_id: i64,
        asset_id: i64,
        amount: f64,
        purchase_price: Option<f64>,
        purchase_date: Option<i64>,
    ) -> Result<Holding> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DatabaseError::InvalidData(format!(
                "Invalid holding amount: {}",
                amount
            )));
        }

        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO holdings (account_id, asset_id, amount, purchase_price, purchase_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![account_id, asset_id, amount, purchase_price, purchase_date, now],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Holding {
                id,
                account_id,
                asset_id,
                amount,
                purchase_price,
                purchase_date,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// Get every holding joined with its account and asset
    pub async fn get_holdings(&self) -> Result<Vec<HoldingDetail>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY h.id", DETAIL_QUERY))?;

            let holdings = stmt
                .query_map([], detail_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(holdings)
        })
        .await
    }

    /// Get a single holding with its account and asset
    pub async fn get_holding(&self, id: i64) -> Result<Option<HoldingDetail>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE h.id = ?1", DETAIL_QUERY))?;

            let holding = stmt.query_row([id], detail_from_row).optional()?;
            Ok(holding)
        })
        .await
    }

    /// Get all holdings belonging to one account
    pub async fn get_holdings_for_account(&self, account_id: i64) -> Result<Vec<HoldingDetail>> {
        self.with_connection(move |conn| {
            let mut stmt =
                conn.prepare(&format!("{} WHERE h.account_id = ?1 ORDER BY h.id", DETAIL_QUERY))?;

            let holdings = stmt
                .query_map([account_id], detail_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(holdings)
        })
        .await
    }

    /// Move a holding and/or change its amount
    pub async fn update_holding(&self, id: i64, account_id: i64, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DatabaseError::InvalidData(format!(
                "Invalid holding amount: {}",
                amount
            )));
        }

        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE holdings SET account_id = ?1, amount = ?2, updated_at = ?3 WHERE id = ?4",
                params![account_id, amount, now, id],
            )?;

            if updated == 0 {
                return Err(DatabaseError::HoldingNotFound(id));
            }
            Ok(())
        })
        .await
    }

    /// Delete a holding
    pub async fn delete_holding(&self, id: i64) -> Result<()> {
        self.with_connection(move |conn| {
            let deleted = conn.execute("DELETE FROM holdings WHERE id = ?1", [id])?;

            if deleted == 0 {
                return Err(DatabaseError::HoldingNotFound(id));
            }

            log::info!("Deleted holding {}", id);
            Ok(())
        })
        .await
    }
}
