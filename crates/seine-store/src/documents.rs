use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use seine_types::{
    AnswerMode, ArtifactPaths, AssetKind, AssetRecord, CrawlStatus, DocumentRecord, FaqItem,
    LinkEdge, MetaTags,
};

use crate::{Result, Store};

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let status: String = row.get("status")?;
    let paths: Option<String> = row.get("local_artifact_paths")?;
    let meta: Option<String> = row.get("meta_tags")?;
    let crawled_at: Option<String> = row.get("crawled_at")?;
    Ok(DocumentRecord {
        url: row.get("url")?,
        canonical_url: row.get("canonical_url")?,
        status: status.parse().unwrap_or(CrawlStatus::Error),
        depth_from_seed: row.get("depth_from_seed")?,
        url_path: row.get("url_path")?,
        content_type: row.get("content_type")?,
        title: row.get("title")?,
        extracted_text: row.get("extracted_text")?,
        local_artifact_paths: paths
            .as_deref()
            .and_then(|raw| ArtifactPaths::from_json(raw).ok())
            .unwrap_or_default(),
        crawled_at: crawled_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        error_message: row.get("error_message")?,
        meta_tags: meta
            .as_deref()
            .and_then(|raw| MetaTags::from_json(raw).ok())
            .unwrap_or_default(),
    })
}

impl Store {
    /// Inserts or fully replaces a document row. The whole record is
    /// written each time, so callers build the complete state they intend
    /// to persist (the engine upserts once before children for FK
    /// satisfaction and once more with the accumulated result).
    pub async fn upsert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO documents (
                url, canonical_url, status, depth_from_seed, url_path,
                content_type, title, extracted_text, local_artifact_paths,
                crawled_at, error_message, meta_tags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(url) DO UPDATE SET
                canonical_url = excluded.canonical_url,
                status = excluded.status,
                depth_from_seed = excluded.depth_from_seed,
                url_path = excluded.url_path,
                content_type = excluded.content_type,
                title = excluded.title,
                extracted_text = excluded.extracted_text,
                local_artifact_paths = excluded.local_artifact_paths,
                crawled_at = excluded.crawled_at,
                error_message = excluded.error_message,
                meta_tags = excluded.meta_tags",
            params![
                doc.url,
                doc.canonical_url,
                doc.status.to_string(),
                doc.depth_from_seed,
                doc.url_path,
                doc.content_type,
                doc.title,
                doc.extracted_text,
                doc.local_artifact_paths.to_json(),
                doc.crawled_at.map(|dt| dt.to_rfc3339()),
                doc.error_message,
                doc.meta_tags.to_json(),
            ],
        )?;
        Ok(())
    }

    pub async fn get_document(&self, url: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock().await;
        let doc = conn
            .query_row("SELECT * FROM documents WHERE url = ?1", [url], document_from_row)
            .optional()?;
        Ok(doc)
    }

    pub async fn document_count(&self) -> Result<u64> {
        let conn = self.lock().await;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Bulk-inserts FAQ items for a freshly crawled document.
    pub async fn add_faq_items(&self, items: &[FaqItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO faq_items (
                    document_url, question_text, answer_text, answer_raw_html,
                    answer_mode, link_depth_to_answer
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for item in items {
                stmt.execute(params![
                    item.document_url,
                    item.question_text,
                    item.answer_text,
                    item.answer_raw_html,
                    item.answer_mode.as_str(),
                    item.link_depth_to_answer,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub async fn faq_items_for(&self, document_url: &str) -> Result<Vec<FaqItem>> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT document_url, question_text, answer_text, answer_raw_html,
                    answer_mode, link_depth_to_answer
             FROM faq_items WHERE document_url = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map([document_url], |row| {
                let mode: Option<String> = row.get(4)?;
                Ok(FaqItem {
                    document_url: row.get(0)?,
                    question_text: row.get(1)?,
                    answer_text: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    answer_raw_html: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    answer_mode: mode
                        .as_deref()
                        .and_then(|raw| raw.parse().ok())
                        .unwrap_or(AnswerMode::DirectText),
                    link_depth_to_answer: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Bulk-inserts the complete outbound edge set of a page. The parent
    /// document row must already exist (FK).
    pub async fn add_link_edges(&self, edges: &[LinkEdge]) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO link_edges (
                    parent_url, child_url, anchor_text, is_external, canonical_child_url
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for edge in edges {
                stmt.execute(params![
                    edge.parent_url,
                    edge.child_url,
                    edge.anchor_text,
                    edge.is_external,
                    edge.canonical_child_url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub async fn edges_from(&self, parent_url: &str) -> Result<Vec<LinkEdge>> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT parent_url, child_url, anchor_text, is_external, canonical_child_url
             FROM link_edges WHERE parent_url = ?1 ORDER BY id",
        )?;
        let edges = stmt
            .query_map([parent_url], |row| {
                Ok(LinkEdge {
                    parent_url: row.get(0)?,
                    child_url: row.get(1)?,
                    anchor_text: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    is_external: row.get(3)?,
                    canonical_child_url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Registers (or refreshes) an asset, deduplicated by asset URL.
    pub async fn add_asset(&self, asset: &AssetRecord) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO assets (asset_url, source_page_url, asset_type, local_path)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(asset_url) DO UPDATE SET
                source_page_url = excluded.source_page_url,
                asset_type = excluded.asset_type,
                local_path = excluded.local_path",
            params![
                asset.asset_url,
                asset.source_page_url,
                asset.asset_type.as_str(),
                asset.local_path,
            ],
        )?;
        Ok(())
    }

    pub async fn get_asset(&self, asset_url: &str) -> Result<Option<AssetRecord>> {
        let conn = self.lock().await;
        let asset = conn
            .query_row(
                "SELECT asset_url, source_page_url, asset_type, local_path
                 FROM assets WHERE asset_url = ?1",
                [asset_url],
                |row| {
                    let kind: String = row.get(2)?;
                    Ok(AssetRecord {
                        asset_url: row.get(0)?,
                        source_page_url: row.get(1)?,
                        asset_type: kind.parse().unwrap_or(AssetKind::Pdf),
                        local_path: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(asset)
    }

    /// Records an external URL sighting; repeats are no-ops.
    pub async fn register_external_url(&self, url: &str) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO external_links_global (url, first_seen_at) VALUES (?1, ?2)",
            params![url, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Records an external domain sighting; repeats are no-ops.
    pub async fn register_external_domain(&self, domain: &str) -> Result<()> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO external_domains_global (domain, first_seen_at) VALUES (?1, ?2)",
            params![domain, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub async fn external_urls(&self) -> Result<Vec<String>> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare("SELECT url FROM external_links_global ORDER BY url")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(urls)
    }

    pub async fn external_domains(&self) -> Result<Vec<String>> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare("SELECT domain FROM external_domains_global ORDER BY domain")?;
        let domains = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seine_types::ArtifactKind;

    fn crawled_doc(url: &str) -> DocumentRecord {
        let mut doc = DocumentRecord::new(url, CrawlStatus::Crawled);
        doc.canonical_url = Some(url.to_string());
        doc.depth_from_seed = Some(1);
        doc.content_type = Some("text/html".to_string());
        doc.crawled_at = Some(Utc::now());
        doc
    }

    #[tokio::test]
    async fn test_upsert_round_trip() {
        let store = Store::open_in_memory().expect("open store");
        let mut doc = crawled_doc("https://site.test/a");
        doc.title = Some("A page".to_string());
        doc.local_artifact_paths.insert(ArtifactKind::Html, "html/x.html".to_string());
        doc.meta_tags.is_faq_page = true;
        store.upsert_document(&doc).await.unwrap();

        let loaded = store.get_document("https://site.test/a").await.unwrap().expect("row");
        assert_eq!(loaded.status, CrawlStatus::Crawled);
        assert_eq!(loaded.title.as_deref(), Some("A page"));
        assert_eq!(loaded.local_artifact_paths.get(ArtifactKind::Html), Some("html/x.html"));
        assert!(loaded.meta_tags.is_faq_page);
        assert!(loaded.crawled_at.is_some());
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_state() {
        let store = Store::open_in_memory().expect("open store");
        let url = "https://site.test/a";
        store
            .upsert_document(&DocumentRecord::new(url, CrawlStatus::FetchError))
            .await
            .unwrap();
        store.upsert_document(&crawled_doc(url)).await.unwrap();

        let loaded = store.get_document(url).await.unwrap().expect("row");
        assert_eq!(loaded.status, CrawlStatus::Crawled);
        assert_eq!(store.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_faq_items_require_parent_document() {
        let store = Store::open_in_memory().expect("open store");
        let item = FaqItem {
            document_url: "https://site.test/orphan".to_string(),
            question_text: "Q".to_string(),
            answer_text: "A".to_string(),
            answer_raw_html: "A".to_string(),
            answer_mode: AnswerMode::DirectText,
            link_depth_to_answer: None,
        };
        assert!(store.add_faq_items(std::slice::from_ref(&item)).await.is_err());

        store.upsert_document(&crawled_doc("https://site.test/orphan")).await.unwrap();
        store.add_faq_items(std::slice::from_ref(&item)).await.unwrap();
        let items = store.faq_items_for("https://site.test/orphan").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].answer_mode, AnswerMode::DirectText);
    }

    #[tokio::test]
    async fn test_edges_round_trip() {
        let store = Store::open_in_memory().expect("open store");
        store.upsert_document(&crawled_doc("https://site.test/p")).await.unwrap();
        let edges = vec![
            LinkEdge {
                parent_url: "https://site.test/p".to_string(),
                child_url: "https://site.test/c".to_string(),
                anchor_text: "child".to_string(),
                is_external: false,
                canonical_child_url: "https://site.test/c".to_string(),
            },
            LinkEdge {
                parent_url: "https://site.test/p".to_string(),
                child_url: "https://elsewhere.example/x".to_string(),
                anchor_text: "away".to_string(),
                is_external: true,
                canonical_child_url: "https://elsewhere.example/x".to_string(),
            },
        ];
        store.add_link_edges(&edges).await.unwrap();

        let loaded = store.edges_from("https://site.test/p").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!loaded[0].is_external);
        assert!(loaded[1].is_external);
    }

    #[tokio::test]
    async fn test_asset_dedup_by_url() {
        let store = Store::open_in_memory().expect("open store");
        let mut asset = AssetRecord {
            asset_url: "https://site.test/guide.pdf".to_string(),
            source_page_url: Some("https://site.test/p".to_string()),
            asset_type: AssetKind::Pdf,
            local_path: Some("pdf/one.pdf".to_string()),
        };
        store.add_asset(&asset).await.unwrap();
        asset.local_path = Some("pdf/two.pdf".to_string());
        store.add_asset(&asset).await.unwrap();

        let loaded = store.get_asset("https://site.test/guide.pdf").await.unwrap().expect("row");
        assert_eq!(loaded.local_path.as_deref(), Some("pdf/two.pdf"));
    }

    #[tokio::test]
    async fn test_external_registries_dedupe() {
        let store = Store::open_in_memory().expect("open store");
        store.register_external_url("https://elsewhere.example/x").await.unwrap();
        store.register_external_url("https://elsewhere.example/x").await.unwrap();
        store.register_external_domain("elsewhere.example").await.unwrap();
        store.register_external_domain("elsewhere.example").await.unwrap();

        assert_eq!(store.external_urls().await.unwrap().len(), 1);
        assert_eq!(store.external_domains().await.unwrap().len(), 1);
    }
}
