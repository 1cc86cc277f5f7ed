use crate::errors::Result;
use crate::types::{AuditAction, AuditEntity, AuditRecord};
use crate::Database;
use rusqlite::params;

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let action: String = row.get(1)?;
    let entity: String = row.get(2)?;
    Ok(AuditRecord {
        id: row.get(0)?,
        action: AuditAction::from(action.as_str()),
        entity_type: AuditEntity::from(entity.as_str()),
        entity_id: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const AUDIT_COLUMNS: &str = "id, action, entity_type, entity_id, old_value, new_value, created_at";

impl Database {
    /// Append one change record to the audit log
    pub async fn append_audit(
        &self,
        action: AuditAction,
        entity_type: AuditEntity,
        entity_id: i64,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<i64> {
        let now = Self::current_timestamp();

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (action, entity_type, entity_id, old_value, new_value, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    action.as_str(),
                    entity_type.as_str(),
                    entity_id,
                    old_value,
                    new_value,
                    now
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent audit records, newest first
    pub async fn audit_log(&self, limit: u32) -> Result<Vec<AuditRecord>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM audit_log ORDER BY created_at DESC, id DESC LIMIT ?1",
                AUDIT_COLUMNS
            ))?;

            let records = stmt
                .query_map([limit], record_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    /// Full change history for one entity, newest first
    pub async fn audit_for_entity(
        &self,
        entity_type: AuditEntity,
        entity_id: i64,
    ) -> Result<Vec<AuditRecord>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
                 ORDER BY created_at DESC, id DESC",
                AUDIT_COLUMNS
            ))?;

            let records = stmt
                .query_map(params![entity_type.as_str(), entity_id], record_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }
}
