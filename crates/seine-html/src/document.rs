use anyhow::{anyhow, Result};
use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::processor::element_text;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));

/// Content pulled from one HTML document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub extracted_text: String,
    pub markdown_content: String,
    pub title: String,
}

/// Main-content extraction: a configured selector cascade with `body` and
/// whole-document fallbacks, plain text and Markdown renderings, and a
/// title with an `h1` fallback.
pub struct DocumentExtractor {
    selectors: Vec<Selector>,
    converter: HtmlToMarkdown,
}

impl DocumentExtractor {
    /// Builds the extractor, rejecting unparseable selectors up front.
    pub fn new(selectors: &[String]) -> Result<Self> {
        let selectors = selectors
            .iter()
            .map(|raw| {
                Selector::parse(raw).map_err(|e| anyhow!("invalid main content selector '{raw}': {e}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "noscript", "iframe", "svg", "nav", "footer"])
            .build();
        Ok(Self { selectors, converter })
    }

    pub fn extract(&self, doc: &Html, url: &str) -> ExtractedDocument {
        let main = self.find_main_content(doc);

        let extracted_text = element_text(main, "\n");

        // Markdown conversion failures degrade to an empty document;
        // extraction itself still succeeds.
        let markdown_content = match self.converter.convert(&main.html()) {
            Ok(markdown) => markdown,
            Err(error) => {
                warn!(url = %url, error = %error, "HTML to Markdown conversion failed");
                String::new()
            }
        };

        ExtractedDocument {
            extracted_text,
            markdown_content,
            title: extract_title(doc),
        }
    }

    /// First configured selector that matches wins; then `body`; then the
    /// document root.
    fn find_main_content<'a>(&self, doc: &'a Html) -> ElementRef<'a> {
        for selector in &self.selectors {
            if let Some(found) = doc.select(selector).next() {
                return found;
            }
        }
        doc.select(&BODY).next().unwrap_or_else(|| doc.root_element())
    }
}

fn extract_title(doc: &Html) -> String {
    if let Some(title) = doc.select(&TITLE).next() {
        let text = element_text(title, " ");
        if !text.is_empty() {
            return text;
        }
    }
    doc.select(&H1)
        .next()
        .map(|h1| element_text(h1, " "))
        .unwrap_or_default()
}
