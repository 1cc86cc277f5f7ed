use crate::errors::Result;
use rusqlite::Connection;

/// Initialize the database schema
pub fn apply_migrations(conn: &Connection) -> Result<()> {
    // Enable WAL mode and foreign keys
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    log::info!("Creating database schema...");

    // Create all tables at once
    conn.execute_batch(FULL_SCHEMA)?;

    log::info!("Database schema created successfully");
    Ok(())
}

// Complete database schema - all tables and indexes
const FULL_SCHEMA: &str = r#"
-- Tally Database Schema v1
PRAGMA journal_mode=WAL;
PRAGMA foreign_keys = ON;

-- Accounts are the places holdings live ("hardware wallet", "NeoBank")
CREATE TABLE IF NOT EXISTS accounts (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL UNIQUE,
    kind         TEXT,               -- 'wallet' | 'bank' | 'exchange' | free-form
    color        TEXT,               -- hex color for display
    created_at   INTEGER NOT NULL,   -- epoch seconds
    updated_at   INTEGER NOT NULL
);

-- Asset registry: one row per tracked ticker
CREATE TABLE IF NOT EXISTS assets (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol       TEXT NOT NULL UNIQUE,  -- always stored uppercase
    name         TEXT NOT NULL,
    class        TEXT NOT NULL CHECK(class IN ('crypto','fiat','stock','other')),
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL
);

-- Holdings link an amount of an asset to an account
CREATE TABLE IF NOT EXISTS holdings (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id     INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    asset_id       INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    amount         REAL NOT NULL,
    purchase_price REAL,
    purchase_date  INTEGER,            -- epoch seconds
    created_at     INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_holdings_account ON holdings(account_id);
CREATE INDEX IF NOT EXISTS idx_holdings_asset ON holdings(asset_id);

-- Latest known USD price per asset, upserted on every refresh
CREATE TABLE IF NOT EXISTS price_cache (
    asset_id     INTEGER PRIMARY KEY REFERENCES assets(id) ON DELETE CASCADE,
    price_usd    REAL NOT NULL,
    updated_at   INTEGER NOT NULL
);

-- Append-only price observations for history views
CREATE TABLE IF NOT EXISTS price_history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id     INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    price_usd    REAL NOT NULL,
    recorded_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_price_history_asset_time ON price_history(asset_id, recorded_at);

-- Change log for portfolio mutations, values are JSON blobs
CREATE TABLE IF NOT EXISTS audit_log (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    action       TEXT NOT NULL CHECK(action IN ('CREATE','UPDATE','DELETE')),
    entity_type  TEXT NOT NULL CHECK(entity_type IN ('ACCOUNT','ASSET','HOLDING')),
    entity_id    INTEGER NOT NULL,
    old_value    TEXT,
    new_value    TEXT,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_log_created ON audit_log(created_at);

-- Point-in-time portfolio totals
CREATE TABLE IF NOT EXISTS snapshots (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    total_value_usd REAL NOT NULL,
    detail_json     TEXT,
    taken_at        INTEGER NOT NULL
);

-- Key/value metadata and preferences
CREATE TABLE IF NOT EXISTS meta (
    key          TEXT PRIMARY KEY,
    val          TEXT
);
"#;
