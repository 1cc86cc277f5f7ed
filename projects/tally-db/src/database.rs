use crate::errors::Result;
use crate::migrations::apply_migrations;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Main database manager
pub struct Database {
    connection: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Create a new database instance at the default path
    pub async fn new() -> Result<Self> {
        let path = crate::get_database_path();
        let db = Self::open_at_path(path).await?;
        Ok(db)
    }

    /// Create a database instance at a specific path
    pub async fn open_at_path(path: PathBuf) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        log::info!("Opening database at: {:?}", path);

        // Open connection with proper flags
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        // Apply migrations
        if let Err(e) = apply_migrations(&conn) {
            log::error!("Failed to apply migrations: {}", e);
            return Err(e);
        }

        let db = Database {
            connection: Arc::new(Mutex::new(conn)),
            path,
        };

        log::info!("Database initialized successfully");
        Ok(db)
    }

    /// Create an in-memory database instance for testing
    pub async fn new_in_memory() -> Result<Self> {
        log::info!("Creating in-memory database for testing");

        // Create in-memory connection
        let conn = Connection::open_in_memory()?;

        // Apply migrations
        if let Err(e) = apply_migrations(&conn) {
            log::error!("Failed to apply migrations to in-memory database: {}", e);
            return Err(e);
        }

        let db = Database {
            connection: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };

        log::info!("In-memory database initialized successfully");
        Ok(db)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Health check - ensure database is accessible
    pub async fn health_check(&self) -> Result<()> {
        let conn = self.connection.lock().await;
        match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("Health check failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Execute a closure with database connection
    pub async fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send,
        R: Send,
    {
        let conn = self.connection.lock().await;
        f(&conn)
    }

    /// Execute a transaction
    pub async fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send,
        R: Send,
    {
        let mut conn = self.connection.lock().await;
        let tx = conn.transaction()?;

        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Get current UNIX timestamp
    pub fn current_timestamp() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    // ========== Meta/Preferences Methods ==========

    /// Set user preference
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        let pref_key = format!("pref_{}", key);

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, val) VALUES (?1, ?2)",
                rusqlite::params![pref_key, value],
            )?;
            Ok(())
        })
        .await
    }

    /// Get user preference
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let pref_key = format!("pref_{}", key);

        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT val FROM meta WHERE key = ?1")?;
            let result: Option<String> = stmt.query_row([pref_key], |row| row.get(0)).ok();
            Ok(result)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let _ = env_logger::try_init();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open_at_path(db_path).await.unwrap();
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_preferences_roundtrip() {
        let db = Database::new_in_memory().await.unwrap();

        assert_eq!(db.get_preference("history_sink").await.unwrap(), None);

        db.set_preference("history_sink", "off").await.unwrap();
        assert_eq!(
            db.get_preference("history_sink").await.unwrap(),
            Some("off".to_string())
        );

        // Overwrite wins
        db.set_preference("history_sink", "on").await.unwrap();
        assert_eq!(
            db.get_preference("history_sink").await.unwrap(),
            Some("on".to_string())
        );
    }
}
