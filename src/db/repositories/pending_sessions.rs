use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
};
use crate::session::{LocalQueue, QueuedRecord, SessionRecord};

fn row_to_queued(row: &Row) -> Result<QueuedRecord> {
    let payload: String = row.get("payload")?;
    let attempts: i64 = row.get("attempts")?;
    let queued_at: String = row.get("queued_at")?;

    Ok(QueuedRecord {
        record: serde_json::from_str(&payload).context("failed to decode queued session")?,
        attempts: to_u32(attempts, "attempts")?,
        last_error: row.get("last_error")?,
        queued_at: parse_datetime(&queued_at, "queued_at")?,
    })
}

#[async_trait]
impl LocalQueue for Database {
    async fn enqueue(&self, record: &SessionRecord, error: &str) -> Result<bool> {
        let payload = serde_json::to_string(record).context("failed to encode session")?;
        let key = record.idempotency_key.to_string();
        let phase = record.phase.as_str();
        let error = error.to_string();

        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            // The unique key makes re-queueing the same record a no-op.
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO pending_sessions
                    (idempotency_key, phase, payload, attempts, last_error, queued_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
                params![key, phase, payload, error, now],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn drain(&self) -> Result<Vec<QueuedRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT payload, attempts, last_error, queued_at
                 FROM pending_sessions
                 ORDER BY seq ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut queued = Vec::new();
            while let Some(row) = rows.next()? {
                queued.push(row_to_queued(row)?);
            }
            Ok(queued)
        })
        .await
    }

    async fn remove(&self, key: Uuid) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM pending_sessions WHERE idempotency_key = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_failure(&self, key: Uuid, error: &str) -> Result<u32> {
        let key = key.to_string();
        let error = error.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE pending_sessions
                 SET attempts = attempts + 1, last_error = ?2, updated_at = ?3
                 WHERE idempotency_key = ?1",
                params![key, error, Utc::now().to_rfc3339()],
            )?;
            if updated == 0 {
                return Err(anyhow!("session {key} is not queued"));
            }

            let attempts: i64 = conn.query_row(
                "SELECT attempts FROM pending_sessions WHERE idempotency_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            to_u32(attempts, "attempts")
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM pending_sessions", [], |row| row.get(0))?;
            usize::try_from(count).map_err(|_| anyhow!("negative row count {count}"))
        })
        .await
    }
}
