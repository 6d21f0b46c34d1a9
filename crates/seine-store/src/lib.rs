//! Seine Store - the single embedded SQLite file behind the crawler.
//!
//! The store owns the schema, all idempotent upserts, the durable frontier
//! queue, the full-text index, and the batch exporter. Every mutation runs
//! in its own small transaction; callers share the store behind an async
//! mutex, which serializes writers (network and parsing dominate CPU, so a
//! writer lock is cheap).

mod documents;
mod export;
mod queue;
mod schema;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;

/// Infrastructure failures. These are the only errors the engine lets
/// propagate out of the crawl loop.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Handle to the embedded store. Cheap to share via `Arc`.
pub struct Store {
    conn: Mutex<Connection>,
}

/// One full-text search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
}

impl Store {
    /// Opens (creating if needed) the store at `path`, including parent
    /// directories, and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        schema::init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// An in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Full-text query over document titles and extracted text.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT url, title FROM documents_fts WHERE documents_fts MATCH ?1 ORDER BY rank",
        )?;
        let hits = stmt
            .query_map([query], |row| {
                Ok(SearchHit { url: row.get(0)?, title: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    /// Reads a value from the per-crawl key/value state table.
    pub async fn get_state(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        let conn = self.lock().await;
        let value = conn
            .query_row("SELECT value FROM crawl_state WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Writes a value into the per-crawl key/value state table.
    pub async fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO crawl_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }
}
