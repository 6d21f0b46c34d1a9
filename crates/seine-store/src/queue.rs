use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use seine_types::{QueueItem, QueueStatus};
use std::collections::BTreeMap;
use tracing::info;

use crate::{Result, Store};

impl Store {
    /// Adds a URL to the frontier unless it is already present. The
    /// primary key makes a racing insert a no-op; returns whether a row
    /// was actually added.
    pub async fn enqueue(
        &self,
        url: &str,
        depth: u32,
        parent_url: Option<&str>,
        priority: i64,
    ) -> Result<bool> {
        let conn = self.lock().await;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO crawl_queue (url, depth, parent_url, status, added_at, priority)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
            params![url, depth, parent_url, Utc::now().to_rfc3339(), priority],
        )?;
        Ok(changed > 0)
    }

    /// Next pending row: highest priority first, then FIFO by insertion.
    pub async fn next_pending(&self) -> Result<Option<QueueItem>> {
        let conn = self.lock().await;
        let item = conn
            .query_row(
                "SELECT url, depth, parent_url, status, priority, attempts
                 FROM crawl_queue
                 WHERE status = 'pending'
                 ORDER BY priority DESC, added_at ASC
                 LIMIT 1",
                [],
                |row| {
                    let status: String = row.get(3)?;
                    Ok(QueueItem {
                        url: row.get(0)?,
                        depth: row.get(1)?,
                        parent_url: row.get(2)?,
                        status: status.parse().unwrap_or(QueueStatus::Pending),
                        priority: row.get(4)?,
                        attempts: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    pub async fn mark_queue(&self, url: &str, status: QueueStatus) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "UPDATE crawl_queue SET status = ?1 WHERE url = ?2",
            params![status.as_str(), url],
        )?;
        Ok(())
    }

    /// Fails a queue row and records why.
    pub async fn mark_queue_failed(&self, url: &str, reason: &str) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "UPDATE crawl_queue SET status = 'failed', last_error = ?1 WHERE url = ?2",
            params![reason, url],
        )?;
        Ok(())
    }

    /// Whether the URL has ever been seen: a document row or any queue row
    /// counts.
    pub async fn is_url_known(&self, url: &str) -> Result<bool> {
        let conn = self.lock().await;
        let in_documents: Option<i64> = conn
            .query_row("SELECT 1 FROM documents WHERE url = ?1", [url], |row| row.get(0))
            .optional()?;
        if in_documents.is_some() {
            return Ok(true);
        }
        let in_queue: Option<i64> = conn
            .query_row("SELECT 1 FROM crawl_queue WHERE url = ?1", [url], |row| row.get(0))
            .optional()?;
        Ok(in_queue.is_some())
    }

    pub async fn queue_counts(&self) -> Result<BTreeMap<String, u64>> {
        let conn = self.lock().await;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM crawl_queue GROUP BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(counts)
    }

    /// Startup recovery for rows a crashed run left in `processing`:
    /// each goes back to `pending` with its attempt counter bumped, unless
    /// it has already burned `retry_cap` attempts, in which case it is
    /// failed for good. Returns the number of rows re-queued.
    pub async fn recover_interrupted(&self, retry_cap: u32) -> Result<u64> {
        let mut conn = self.lock().await;
        let tx = conn.transaction()?;
        let exhausted = tx.execute(
            "UPDATE crawl_queue
             SET status = 'failed', last_error = 'retry cap reached after interrupted run'
             WHERE status = 'processing' AND attempts + 1 >= ?1",
            params![retry_cap],
        )?;
        let requeued = tx.execute(
            "UPDATE crawl_queue
             SET status = 'pending', attempts = attempts + 1
             WHERE status = 'processing'",
            [],
        )?;
        tx.commit()?;
        if exhausted > 0 {
            info!(exhausted = exhausted, "interrupted rows hit the retry cap and were failed");
        }
        Ok(requeued as u64)
    }
}
