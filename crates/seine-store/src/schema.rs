use rusqlite::Connection;

/// Everything the crawler persists lives in one SQLite file. The full-text
/// index is an external-content FTS5 table over `documents`, kept in sync
/// by triggers, so re-upserting a document can never duplicate index rows.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    url TEXT PRIMARY KEY,
    canonical_url TEXT,
    status TEXT NOT NULL,
    depth_from_seed INTEGER,
    url_path TEXT,
    content_type TEXT,
    title TEXT,
    extracted_text TEXT,
    local_artifact_paths TEXT NOT NULL DEFAULT '{}',
    crawled_at TEXT,
    error_message TEXT,
    meta_tags TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS faq_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_url TEXT NOT NULL,
    question_text TEXT NOT NULL,
    answer_text TEXT,
    answer_raw_html TEXT,
    answer_mode TEXT,
    link_depth_to_answer INTEGER,
    FOREIGN KEY (document_url) REFERENCES documents(url)
);

CREATE TABLE IF NOT EXISTS link_edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_url TEXT NOT NULL,
    child_url TEXT NOT NULL,
    anchor_text TEXT,
    is_external INTEGER NOT NULL DEFAULT 0,
    canonical_child_url TEXT,
    FOREIGN KEY (parent_url) REFERENCES documents(url)
);

CREATE TABLE IF NOT EXISTS assets (
    asset_url TEXT PRIMARY KEY,
    source_page_url TEXT,
    asset_type TEXT NOT NULL,
    local_path TEXT
);

CREATE TABLE IF NOT EXISTS external_links_global (
    url TEXT PRIMARY KEY,
    first_seen_at TEXT
);

CREATE TABLE IF NOT EXISTS external_domains_global (
    domain TEXT PRIMARY KEY,
    first_seen_at TEXT
);

CREATE TABLE IF NOT EXISTS crawl_queue (
    url TEXT PRIMARY KEY,
    depth INTEGER NOT NULL,
    parent_url TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    added_at TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT
);

CREATE TABLE IF NOT EXISTS crawl_state (
    key TEXT PRIMARY KEY,
    value TEXT
);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    url UNINDEXED,
    title,
    extracted_text,
    content='documents'
);

CREATE TRIGGER IF NOT EXISTS documents_fts_ai AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts(rowid, url, title, extracted_text)
    VALUES (new.rowid, new.url, new.title, new.extracted_text);
END;

CREATE TRIGGER IF NOT EXISTS documents_fts_ad AFTER DELETE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, url, title, extracted_text)
    VALUES ('delete', old.rowid, old.url, old.title, old.extracted_text);
END;

CREATE TRIGGER IF NOT EXISTS documents_fts_au AFTER UPDATE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, url, title, extracted_text)
    VALUES ('delete', old.rowid, old.url, old.title, old.extracted_text);
    INSERT INTO documents_fts(rowid, url, title, extracted_text)
    VALUES (new.rowid, new.url, new.title, new.extracted_text);
END;
"#;

pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)
}
