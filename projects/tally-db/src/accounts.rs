use crate::errors::{DatabaseError, Result};
use crate::types::Account;
use crate::Database;
use rusqlite::{params, OptionalExtension};

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, name, kind, color, created_at, updated_at";

impl Database {
    /// Create an account and return the stored record
    pub async fn create_account(&self, name: &str, kind: Option<&str>) -> Result<Account> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DatabaseError::InvalidData(
                "Account name cannot be empty".to_string(),
            ));
        }

        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO accounts (name, kind, color, created_at, updated_at) VALUES (?1, ?2, NULL, ?3, ?3)",
                params![name, kind, now],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Account {
                id,
                name,
                kind: kind.map(|k| k.to_string()),
                color: None,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// Get all accounts, ordered by name
    pub async fn get_accounts(&self) -> Result<Vec<Account>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM accounts ORDER BY name",
                ACCOUNT_COLUMNS
            ))?;

            let accounts = stmt
                .query_map([], account_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(accounts)
        })
        .await
    }

    /// Look up an account by its exact name
    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let name = name.trim().to_string();

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM accounts WHERE name = ?1",
                ACCOUNT_COLUMNS
            ))?;

            let account = stmt.query_row([name], account_from_row).optional()?;
            Ok(account)
        })
        .await
    }

    /// Update an account's name and kind
    pub async fn update_account(&self, id: i64, name: &str, kind: Option<&str>) -> Result<()> {
        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE accounts SET name = ?1, kind = ?2, updated_at = ?3 WHERE id = ?4",
                params![name, kind, now, id],
            )?;

            if updated == 0 {
                return Err(DatabaseError::AccountNotFound(id));
            }
            Ok(())
        })
        .await
    }

    /// Delete an account; its holdings go with it
    pub async fn delete_account(&self, id: i64) -> Result<()> {
        self.with_connection(move |conn| {
            let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;

            if deleted == 0 {
                return Err(DatabaseError::AccountNotFound(id));
            }

            log::info!("Deleted account {}", id);
            Ok(())
        })
        .await
    }
}
