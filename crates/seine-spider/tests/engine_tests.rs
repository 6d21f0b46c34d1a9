//! End-to-end crawl scenarios against a mock site.
//!
//! Each test stands up a wiremock server, points a fully wired engine at
//! it inside a temp workspace, and asserts on the resulting store rows
//! and artifacts.

use seine_config::{CrawlerConfig, OutputDirectories, RateLimitConfig, RetriesConfig};
use seine_spider::CrawlEngine;
use seine_store::Store;
use seine_types::{ArtifactKind, AssetKind, CrawlStatus};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_domain(server: &MockServer) -> String {
    let url = Url::parse(&server.uri()).expect("server uri");
    format!("{}:{}", url.host_str().expect("host"), url.port().expect("port"))
}

fn test_config(server: &MockServer, workspace: &Path) -> CrawlerConfig {
    CrawlerConfig {
        seed_urls: vec![format!("{}/", server.uri())],
        allowed_domains: vec![server_domain(server)],
        user_agent: "SeineTest/0.1".to_string(),
        rate_limit: RateLimitConfig { delay: 0.0 },
        retries: RetriesConfig { total: 0, backoff_factor: 0.0 },
        db_path: workspace.join("crawl.db"),
        output_directories: OutputDirectories {
            html: workspace.join("html"),
            md: workspace.join("md"),
            pdf: workspace.join("pdf"),
            pdf_text: workspace.join("pdf_text"),
            video: workspace.join("video"),
            transcripts: workspace.join("transcripts"),
            json: workspace.join("json"),
        },
        ..CrawlerConfig::default()
    }
}

async fn run_crawl(config: &CrawlerConfig) -> Arc<Store> {
    let store = Arc::new(Store::open(&config.db_path).expect("open store"));
    let engine =
        CrawlEngine::new(config, store.clone(), CancellationToken::new()).expect("build engine");
    engine.run().await.expect("crawl run");
    store
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_canonically_equal_seeds_yield_one_document() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");
    mount_page(&server, "/a", "<html><body><p>Target</p></body></html>").await;

    let mut config = test_config(&server, workspace.path());
    // Two spellings of the same URL: host case, trailing slash, query
    // order, fragment.
    config.seed_urls = vec![
        format!("{}/a/?b=2&a=1#x", server.uri()),
        format!("{}/a?a=1&b=2", server.uri()),
    ];
    let store = run_crawl(&config).await;

    assert_eq!(store.document_count().await.unwrap(), 1);
    let canonical = format!("{}/a?a=1&b=2", server.uri());
    let doc = store.get_document(&canonical).await.unwrap().expect("document row");
    assert_eq!(doc.status, CrawlStatus::Crawled);
    assert_eq!(doc.canonical_url.as_deref(), Some(canonical.as_str()));
}

#[tokio::test]
async fn test_robots_denied_page_records_no_content() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/private">secret</a></body></html>"#,
    )
    .await;
    // The blocked page must never be fetched.
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("<html><body>hidden</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;

    let blocked_url = format!("{}/private", server.uri());
    let doc = store.get_document(&blocked_url).await.unwrap().expect("blocked row");
    assert_eq!(doc.status, CrawlStatus::BlockedByRobots);
    assert!(doc.local_artifact_paths.is_empty());
    assert!(store.edges_from(&blocked_url).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_faq_page_widens_depth_horizon() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/faq-branch">faq</a>
            <a href="/plain-branch">plain</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/faq-branch",
        r#"<html><body>
            <details><summary>Q?</summary>An answer.</details>
            <a href="/deep-faq">deeper</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/plain-branch",
        r#"<html><body><a href="/deep-plain">deeper</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/deep-faq", "<html><body><p>Reached</p></body></html>").await;

    let mut config = test_config(&server, workspace.path());
    config.max_depth_general = 1;
    config.max_depth_faq = 2;
    let store = run_crawl(&config).await;

    let deep_faq = format!("{}/deep-faq", server.uri());
    let deep_plain = format!("{}/deep-plain", server.uri());

    // The FAQ page's children escape the general limit.
    let reached = store.get_document(&deep_faq).await.unwrap().expect("deep faq crawled");
    assert_eq!(reached.status, CrawlStatus::Crawled);
    assert_eq!(reached.depth_from_seed, Some(2));

    // The sibling general page at the same depth does not.
    assert!(store.get_document(&deep_plain).await.unwrap().is_none());
    assert!(!store.is_url_known(&deep_plain).await.unwrap());

    // The FAQ page itself is flagged and its items stored.
    let faq_url = format!("{}/faq-branch", server.uri());
    let faq_doc = store.get_document(&faq_url).await.unwrap().expect("faq row");
    assert!(faq_doc.meta_tags.is_faq_page);
    assert_eq!(store.faq_items_for(&faq_url).await.unwrap().len(), 1);

    // Depth bound invariant: nothing beyond the wider horizon.
    let limit = config.max_depth_faq.max(config.max_depth_general);
    for url in [format!("{}/", server.uri()), faq_url, deep_faq] {
        let doc = store.get_document(&url).await.unwrap().expect("row");
        assert!(doc.depth_from_seed.unwrap_or(0) <= limit);
    }
}

#[tokio::test]
async fn test_external_link_recorded_never_fetched() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="https://elsewhere.example/x">away</a></body></html>"#,
    )
    .await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;

    let root = format!("{}/", server.uri());
    let edges = store.edges_from(&root).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].is_external);
    assert_eq!(edges[0].child_url, "https://elsewhere.example/x");

    assert_eq!(
        store.external_urls().await.unwrap(),
        vec!["https://elsewhere.example/x".to_string()]
    );
    assert_eq!(
        store.external_domains().await.unwrap(),
        vec!["elsewhere.example".to_string()]
    );

    // No document row, no frontier row: the external host was never touched.
    assert!(store.get_document("https://elsewhere.example/x").await.unwrap().is_none());
    assert!(!store.is_url_known("https://elsewhere.example/x").await.unwrap());
}

#[tokio::test]
async fn test_pdf_saved_and_registered_as_asset() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/guide.pdf">guide</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/guide.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 not really a pdf".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;

    let pdf_url = format!("{}/guide.pdf", server.uri());
    let doc = store.get_document(&pdf_url).await.unwrap().expect("pdf row");
    assert_eq!(doc.content_type.as_deref(), Some("application/pdf"));
    let pdf_path = doc.local_artifact_paths.get(ArtifactKind::Pdf).expect("pdf artifact");
    assert!(Path::new(pdf_path).exists());
    assert_eq!(
        std::fs::read(pdf_path).unwrap(),
        b"%PDF-1.4 not really a pdf"
    );

    let asset = store.get_asset(&pdf_url).await.unwrap().expect("asset row");
    assert_eq!(asset.asset_type, AssetKind::Pdf);
    // The discovering page, not the asset itself, is the source.
    assert_eq!(asset.source_page_url.as_deref(), Some(format!("{}/", server.uri()).as_str()));
}

#[tokio::test]
async fn test_excluded_section_skipped_without_fetch() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/investor-relations/reports">ir</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/investor-relations/reports"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, workspace.path());
    config.excluded_sitemap_sections = vec!["Investor Relations".to_string()];
    let store = run_crawl(&config).await;

    let skipped = format!("{}/investor-relations/reports", server.uri());
    let doc = store.get_document(&skipped).await.unwrap().expect("skipped row");
    assert_eq!(doc.status, CrawlStatus::SkippedByPolicy);
}

#[tokio::test]
async fn test_content_type_allowlist_miss() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/data.json">data</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"{}".to_vec(), "application/json"))
        .mount(&server)
        .await;

    let mut config = test_config(&server, workspace.path());
    config.content_type_allowlist = vec!["text/html".to_string(), "application/pdf".to_string()];
    let store = run_crawl(&config).await;

    let json_url = format!("{}/data.json", server.uri());
    let doc = store.get_document(&json_url).await.unwrap().expect("row");
    assert_eq!(doc.status, CrawlStatus::UnsupportedType);
    assert_eq!(doc.content_type.as_deref(), Some("application/json"));
    assert!(doc.local_artifact_paths.is_empty());
}

#[tokio::test]
async fn test_http_error_status_recorded() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/missing">gone</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;

    let missing = format!("{}/missing", server.uri());
    let doc = store.get_document(&missing).await.unwrap().expect("row");
    assert_eq!(doc.status, CrawlStatus::Http(404));

    let counts = store.queue_counts().await.unwrap();
    assert_eq!(counts.get("failed"), Some(&1));
    assert_eq!(counts.get("completed"), Some(&1));
}

#[tokio::test]
async fn test_unreachable_host_records_fetch_error() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    // Port 1 refuses connections; the domain is allowed so the engine
    // actually attempts the fetch.
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="http://127.0.0.1:1/x">dead</a></body></html>"#,
    )
    .await;

    let mut config = test_config(&server, workspace.path());
    config.allowed_domains.push("127.0.0.1:1".to_string());
    config.robots_enabled = false;
    let store = run_crawl(&config).await;

    let doc = store
        .get_document("http://127.0.0.1:1/x")
        .await
        .unwrap()
        .expect("fetch error row");
    assert_eq!(doc.status, CrawlStatus::FetchError);
    assert!(doc.error_message.is_some());
}

#[tokio::test]
async fn test_restart_resumes_without_duplicating_work() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/a">a</a><a href="/b">b</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/a", "<html><body><p>A</p></body></html>").await;
    mount_page(&server, "/b", "<html><body><p>B</p></body></html>").await;
    mount_page(&server, "/late", "<html><body><p>Late</p></body></html>").await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;
    let count_after_first = store.document_count().await.unwrap();
    assert_eq!(count_after_first, 3);

    // Simulate a crash that left one extra row mid-processing.
    let late = format!("{}/late", server.uri());
    store.enqueue(&late, 1, None, 0).await.unwrap();
    store
        .mark_queue(&late, seine_types::QueueStatus::Processing)
        .await
        .unwrap();
    drop(store);

    // Second run over the same store: recovers the stale row, re-crawls
    // nothing that is already terminal.
    let store = run_crawl(&config).await;
    assert_eq!(store.document_count().await.unwrap(), count_after_first + 1);
    let doc = store.get_document(&late).await.unwrap().expect("late row crawled");
    assert_eq!(doc.status, CrawlStatus::Crawled);

    let counts = store.queue_counts().await.unwrap();
    assert_eq!(counts.get("pending"), None);
    assert_eq!(counts.get("processing"), None);
}

#[tokio::test]
async fn test_pre_cancelled_engine_exits_cleanly() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");
    mount_page(&server, "/", "<html><body><p>Root</p></body></html>").await;

    let config = test_config(&server, workspace.path());
    let store = Arc::new(Store::open(&config.db_path).expect("open store"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let engine = CrawlEngine::new(&config, store.clone(), cancel).expect("build engine");
    engine.run().await.expect("run exits cleanly");

    // The seed is queued but nothing was processed.
    assert_eq!(store.document_count().await.unwrap(), 0);
    let counts = store.queue_counts().await.unwrap();
    assert_eq!(counts.get("pending"), Some(&1));
}

#[tokio::test]
async fn test_html_artifacts_written_and_indexed() {
    let server = MockServer::start().await;
    let workspace = tempfile::tempdir().expect("tempdir");

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Warranty Portal</title></head><body>
            <main><p>Coverage details for the factory warranty.</p></main>
        </body></html>"#,
    )
    .await;

    let config = test_config(&server, workspace.path());
    let store = run_crawl(&config).await;

    let root = format!("{}/", server.uri());
    let doc = store.get_document(&root).await.unwrap().expect("root row");
    assert_eq!(doc.title.as_deref(), Some("Warranty Portal"));

    let html_path = doc.local_artifact_paths.get(ArtifactKind::Html).expect("html artifact");
    let md_path = doc.local_artifact_paths.get(ArtifactKind::Md).expect("md artifact");
    assert!(Path::new(html_path).exists());
    assert!(Path::new(md_path).exists());

    let hits = store.search("warranty").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, root);
}
