use chrono::Utc;
use seine_config::CrawlerConfig;
use seine_fetch::{Fetcher, RequestSpacer, RetryPolicy, RobotsPolicy};
use seine_html::{processor, DocumentExtractor, FaqExtractor};
use seine_store::{Store, StoreError};
use seine_types::{
    ArtifactKind, AssetKind, AssetRecord, CrawlStatus, DocumentRecord, FaqItem, LinkEdge,
    QueueItem, QueueStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::artifacts::ArtifactWriter;
use crate::canonical::Canonicalizer;

/// Failures inside one URL's content handling. Store failures are
/// infrastructure and propagate out of the crawl loop; everything else is
/// converted into a `PROCESSING_ERROR` status on the document row.
enum HandleError {
    Store(StoreError),
    Content(anyhow::Error),
}

impl From<StoreError> for HandleError {
    fn from(error: StoreError) -> Self {
        HandleError::Store(error)
    }
}

fn content<E: Into<anyhow::Error>>(error: E) -> HandleError {
    HandleError::Content(error.into())
}

/// The orchestrator: pulls frontier rows and runs each through the
/// policy gates, the fetcher, and the content dispatchers, persisting
/// every outcome as a document status. A restart resumes from the queue;
/// all writes are upserts or insert-or-ignore, so the engine is a pure
/// function of `(frontier, store)`.
pub struct CrawlEngine {
    store: Arc<Store>,
    fetcher: Fetcher,
    robots: RobotsPolicy,
    canonicalizer: Canonicalizer,
    doc_extractor: DocumentExtractor,
    faq_extractor: FaqExtractor,
    artifacts: ArtifactWriter,
    seed_urls: Vec<String>,
    allowed_domains: HashSet<String>,
    excluded_sections: Vec<String>,
    content_type_allowlist: Vec<String>,
    max_depth_faq: u32,
    max_depth_general: u32,
    queue_retry_cap: u32,
    cancel: CancellationToken,
}

impl CrawlEngine {
    pub fn new(
        config: &CrawlerConfig,
        store: Arc<Store>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(
            &config.user_agent,
            Duration::from_secs(config.timeouts.connect),
            Duration::from_secs(config.timeouts.read),
            RetryPolicy::new(config.retries.total, config.retries.backoff_factor),
            RequestSpacer::from_secs_f64(config.rate_limit.delay),
        )?;
        let robots = RobotsPolicy::new(
            &config.user_agent,
            config.robots_enabled,
            Duration::from_secs(config.timeouts.read),
        )?;

        Ok(Self {
            store,
            fetcher,
            robots,
            canonicalizer: Canonicalizer::new(config.host_aliases.clone()),
            doc_extractor: DocumentExtractor::new(&config.main_content_selectors)?,
            faq_extractor: FaqExtractor::new(),
            artifacts: ArtifactWriter::new(&config.output_directories)?,
            seed_urls: config.seed_urls.clone(),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            excluded_sections: config
                .excluded_sitemap_sections
                .iter()
                .map(|s| normalize_section(s))
                .filter(|s| !s.is_empty())
                .collect(),
            content_type_allowlist: config
                .content_type_allowlist
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            max_depth_faq: config.max_depth_faq,
            max_depth_general: config.max_depth_general,
            queue_retry_cap: config.queue_retry_cap,
            cancel,
        })
    }

    /// Recovers interrupted work, seeds the frontier, and drains it.
    pub async fn run(&self) -> anyhow::Result<()> {
        let requeued = self.store.recover_interrupted(self.queue_retry_cap).await?;
        if requeued > 0 {
            info!(requeued = requeued, "re-queued rows left processing by a previous run");
        }
        if self.store.get_state("crawl_started_at").await?.is_none() {
            self.store
                .set_state("crawl_started_at", &Utc::now().to_rfc3339())
                .await?;
        }

        for seed in &self.seed_urls {
            let canonical = self.canonicalizer.canonicalize(seed);
            if canonical.is_empty() {
                warn!(seed = %seed, "skipping unparseable seed URL");
                continue;
            }
            if !self.store.is_url_known(&canonical).await? {
                self.store.enqueue(&canonical, 0, None, 100).await?;
            }
        }
        info!("crawl initialized, starting loop");

        loop {
            if self.cancel.is_cancelled() {
                info!("stop requested, exiting crawl loop");
                break;
            }
            let Some(item) = self.store.next_pending().await? else {
                info!("queue empty, crawl finished");
                break;
            };

            info!(url = %item.url, depth = item.depth, "processing");
            self.store.mark_queue(&item.url, QueueStatus::Processing).await?;

            let status = self.process_url(&item).await?;

            // A stop signal lets the in-flight URL finish its writes, then
            // fails its queue row with the interruption reason and exits.
            if self.cancel.is_cancelled() {
                warn!(url = %item.url, "crawl interrupted");
                self.store
                    .mark_queue_failed(&item.url, "interrupted by shutdown")
                    .await?;
                break;
            }

            match status {
                Some(status) if status.is_error() => {
                    self.store
                        .mark_queue_failed(&item.url, &status.to_string())
                        .await?;
                }
                _ => {
                    self.store.mark_queue(&item.url, QueueStatus::Completed).await?;
                }
            }
        }
        Ok(())
    }

    /// Runs one URL through the pipeline. Returns the recorded document
    /// status, or `None` when the URL was dropped without a row (the
    /// out-of-scope safety net). Only store failures are errors.
    async fn process_url(&self, item: &QueueItem) -> Result<Option<CrawlStatus>, StoreError> {
        let url = item.url.as_str();
        let depth = item.depth;

        if !self.robots.can_fetch(url).await {
            warn!(url = %url, "blocked by robots.txt");
            let mut doc = DocumentRecord::new(url, CrawlStatus::BlockedByRobots);
            doc.depth_from_seed = Some(depth);
            self.store.upsert_document(&doc).await?;
            return Ok(Some(CrawlStatus::BlockedByRobots));
        }

        // Externals are filtered before queueing; this is a safety net and
        // leaves no document row behind.
        let domain = Canonicalizer::domain(url);
        if !self.allowed_domains.contains(&domain) {
            info!(url = %url, domain = %domain, "dropping out-of-scope url");
            return Ok(None);
        }

        let url_path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();
        let path_key = url_path.to_lowercase().replace('-', "");
        if let Some(section) = self.excluded_sections.iter().find(|s| path_key.contains(s.as_str())) {
            info!(url = %url, section = %section, "skipping excluded section");
            let mut doc = DocumentRecord::new(url, CrawlStatus::SkippedByPolicy);
            doc.depth_from_seed = Some(depth);
            self.store.upsert_document(&doc).await?;
            return Ok(Some(CrawlStatus::SkippedByPolicy));
        }

        let response = match self.fetcher.get(url).await {
            Ok(response) => response,
            Err(err) => {
                error!(url = %url, error = %err, "fetch failed");
                let mut doc = DocumentRecord::new(url, CrawlStatus::FetchError);
                doc.depth_from_seed = Some(depth);
                doc.error_message = Some(err.to_string());
                self.store.upsert_document(&doc).await?;
                return Ok(Some(CrawlStatus::FetchError));
            }
        };

        let status_code = response.status().as_u16();
        if status_code != 200 {
            let mut doc = DocumentRecord::new(url, CrawlStatus::Http(status_code));
            doc.depth_from_seed = Some(depth);
            self.store.upsert_document(&doc).await?;
            return Ok(Some(CrawlStatus::Http(status_code)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        if !self.content_type_allowlist.is_empty()
            && !self.content_type_allowlist.contains(&content_type)
        {
            info!(url = %url, content_type = %content_type, "skipping unsupported content type");
            let mut doc = DocumentRecord::new(url, CrawlStatus::UnsupportedType);
            doc.depth_from_seed = Some(depth);
            doc.content_type = Some(content_type);
            self.store.upsert_document(&doc).await?;
            return Ok(Some(CrawlStatus::UnsupportedType));
        }

        // Base row first: children (edges, FAQ items) reference it.
        let mut doc = DocumentRecord::new(url, CrawlStatus::Crawled);
        doc.canonical_url = Some(self.canonicalizer.canonicalize(url));
        doc.depth_from_seed = Some(depth);
        doc.url_path = Some(url_path);
        doc.content_type = Some(content_type.clone());
        doc.crawled_at = Some(Utc::now());
        self.store.upsert_document(&doc).await?;

        let handled = if content_type.contains("text/html") {
            self.handle_html(url, response, &mut doc, depth).await
        } else if content_type.contains("application/pdf") {
            self.handle_pdf(url, response, &mut doc, item.parent_url.as_deref()).await
        } else if content_type.contains("video") || content_type.contains("audio") {
            self.handle_media(url, response, &content_type, &mut doc, item.parent_url.as_deref())
                .await
        } else {
            Ok(())
        };

        if let Err(err) = handled {
            match err {
                HandleError::Store(store_err) => return Err(store_err),
                HandleError::Content(err) => {
                    error!(url = %url, error = %err, "content processing failed");
                    doc.status = CrawlStatus::ProcessingError;
                    doc.error_message = Some(err.to_string());
                }
            }
        }

        // Final upsert with accumulated artifact paths, extracted content,
        // and meta tags.
        self.store.upsert_document(&doc).await?;
        Ok(Some(doc.status.clone()))
    }

    async fn handle_html(
        &self,
        url: &str,
        response: reqwest::Response,
        doc: &mut DocumentRecord,
        depth: u32,
    ) -> Result<(), HandleError> {
        let html = response.text().await.map_err(content)?;

        let html_path = self
            .artifacts
            .write_text(ArtifactKind::Html, url, ".html", &html)
            .await
            .map_err(content)?;
        doc.local_artifact_paths.insert(ArtifactKind::Html, html_path);

        // All DOM work happens synchronously here; only owned results
        // cross the await points below.
        let (extracted, faqs, links) = {
            let dom = processor::parse_document(&html);
            let extracted = self.doc_extractor.extract(&dom, url);
            let faqs: Vec<FaqItem> = self.faq_extractor.extract(&dom, url);
            let links = processor::extract_links(&dom, url);
            (extracted, faqs, links)
        };

        let md_path = self
            .artifacts
            .write_text(ArtifactKind::Md, url, ".md", &extracted.markdown_content)
            .await
            .map_err(content)?;
        doc.local_artifact_paths.insert(ArtifactKind::Md, md_path);
        doc.extracted_text = Some(extracted.extracted_text);
        doc.title = Some(extracted.title);

        let is_faq_page = !faqs.is_empty();
        if is_faq_page {
            self.store.add_faq_items(&faqs).await?;
        }
        doc.meta_tags.is_faq_page = is_faq_page;

        // FAQ-ness of this page widens the horizon for its children.
        let effective_limit = if is_faq_page {
            self.max_depth_faq
        } else {
            self.max_depth_general
        };

        let mut edges = Vec::with_capacity(links.len());
        for link in links {
            let canonical_child = self.canonicalizer.canonicalize(&link.url);
            let child_domain = Canonicalizer::domain(&link.url);
            let is_external = !self.allowed_domains.contains(&child_domain);

            edges.push(LinkEdge {
                parent_url: url.to_string(),
                child_url: link.url.clone(),
                anchor_text: link.text,
                is_external,
                canonical_child_url: canonical_child.clone(),
            });

            if is_external {
                self.store.register_external_url(&link.url).await?;
                if !child_domain.is_empty() {
                    self.store.register_external_domain(&child_domain).await?;
                }
            } else {
                let next_depth = depth + 1;
                if next_depth <= effective_limit
                    && !canonical_child.is_empty()
                    && !self.store.is_url_known(&canonical_child).await?
                {
                    self.store.enqueue(&canonical_child, next_depth, Some(url), 0).await?;
                }
            }
        }
        self.store.add_link_edges(&edges).await?;
        Ok(())
    }

    async fn handle_pdf(
        &self,
        url: &str,
        response: reqwest::Response,
        doc: &mut DocumentRecord,
        parent_url: Option<&str>,
    ) -> Result<(), HandleError> {
        let pdf_path = self
            .artifacts
            .write_stream(ArtifactKind::Pdf, url, ".pdf", response)
            .await
            .map_err(content)?;
        doc.local_artifact_paths.insert(ArtifactKind::Pdf, pdf_path.clone());

        // Text extraction failure is recorded but does not fail the
        // document; the saved bytes are the primary artifact.
        let on_disk = self.artifacts.path_for(ArtifactKind::Pdf, url, ".pdf");
        match tokio::fs::read(&on_disk).await {
            // pdf-extract panics on some malformed files; a poison PDF must
            // not take down the crawl loop.
            Ok(bytes) => match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
            {
                Ok(Ok(text)) => {
                    let text_path = self
                        .artifacts
                        .write_text(ArtifactKind::PdfText, url, ".txt", &text)
                        .await
                        .map_err(content)?;
                    doc.local_artifact_paths.insert(ArtifactKind::PdfText, text_path);
                    doc.extracted_text = Some(text);
                }
                Ok(Err(err)) => {
                    warn!(url = %url, error = %err, "PDF text extraction failed");
                    doc.error_message = Some(format!("PDF text extraction failed: {err}"));
                }
                Err(_) => {
                    warn!(url = %url, "PDF text extraction panicked");
                    doc.error_message =
                        Some("PDF text extraction failed: extractor panicked".to_string());
                }
            },
            Err(err) => {
                warn!(url = %url, error = %err, "could not re-read saved PDF");
                doc.error_message = Some(format!("PDF text extraction failed: {err}"));
            }
        }

        self.store
            .add_asset(&AssetRecord {
                asset_url: url.to_string(),
                source_page_url: parent_url.map(str::to_string),
                asset_type: AssetKind::Pdf,
                local_path: Some(pdf_path),
            })
            .await?;
        Ok(())
    }

    async fn handle_media(
        &self,
        url: &str,
        response: reqwest::Response,
        content_type: &str,
        doc: &mut DocumentRecord,
        parent_url: Option<&str>,
    ) -> Result<(), HandleError> {
        let extension = media_extension(content_type);
        match self
            .artifacts
            .write_stream(ArtifactKind::Video, url, &extension, response)
            .await
        {
            Ok(media_path) => {
                doc.local_artifact_paths.insert(ArtifactKind::Video, media_path.clone());
                let kind = if content_type.contains("audio") {
                    AssetKind::Audio
                } else {
                    AssetKind::Video
                };
                self.store
                    .add_asset(&AssetRecord {
                        asset_url: url.to_string(),
                        source_page_url: parent_url.map(str::to_string),
                        asset_type: kind,
                        local_path: Some(media_path),
                    })
                    .await?;
            }
            Err(err) => {
                warn!(url = %url, error = %err, "failed to save media");
                doc.status = CrawlStatus::VideoUnavailable;
                doc.error_message = Some(err.to_string());
            }
        }
        Ok(())
    }
}

/// Section tokens match as lowercased substrings with spaces removed,
/// against the lowercased hyphen-stripped URL path.
fn normalize_section(section: &str) -> String {
    section.to_lowercase().replace(' ', "")
}

fn media_extension(content_type: &str) -> String {
    mime_guess::get_mime_extensions_str(content_type)
        .and_then(|extensions| extensions.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| ".bin".to_string())
}
