use crate::errors::Result;
use crate::types::Snapshot;
use crate::Database;
use rusqlite::params;

impl Database {
    /// Record a point-in-time portfolio total
    pub async fn record_snapshot(
        &self,
        total_value_usd: f64,
        detail_json: Option<String>,
        taken_at: i64,
    ) -> Result<i64> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO snapshots (total_value_usd, detail_json, taken_at) VALUES (?1, ?2, ?3)",
                params![total_value_usd, detail_json, taken_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent snapshots, newest first
    pub async fn snapshots(&self, limit: u32) -> Result<Vec<Snapshot>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, total_value_usd, detail_json, taken_at FROM snapshots
                 ORDER BY taken_at DESC, id DESC LIMIT ?1",
            )?;

            let snapshots = stmt
                .query_map([limit], |row| {
                    Ok(Snapshot {
                        id: row.get(0)?,
                        total_value_usd: row.get(1)?,
                        detail_json: row.get(2)?,
                        taken_at: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(snapshots)
        })
        .await
    }
}
