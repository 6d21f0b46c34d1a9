use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use seine_types::PageLink;
use tracing::debug;
use url::Url;

/// Tags whose subtrees never contribute text or Markdown.
pub const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg"];

static ANCHOR_WITH_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Parses a full HTML document.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts every `a[href]` as an absolute link, skipping empty hrefs and
/// the `javascript:`, `mailto:`, `tel:` pseudo-schemes.
pub fn extract_links(doc: &Html, base_url: &str) -> Vec<PageLink> {
    let Ok(base) = Url::parse(base_url) else {
        debug!(base_url = %base_url, "unparseable base URL, skipping link extraction");
        return Vec::new();
    };

    let mut links = Vec::new();
    for anchor in doc.select(&ANCHOR_WITH_HREF) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        let lowered = href.to_ascii_lowercase();
        if lowered.starts_with("javascript:")
            || lowered.starts_with("mailto:")
            || lowered.starts_with("tel:")
        {
            continue;
        }
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        links.push(PageLink {
            url: absolute.to_string(),
            text: element_text(anchor, " "),
            rel: anchor.value().attr("rel").map(str::to_string),
        });
    }
    links
}

/// Collects the stripped text of an element's subtree, joined by the given
/// separator. Noise subtrees (scripts, styles, embedded frames/vectors)
/// are skipped entirely, which stands in for decomposing them: scraper's
/// arena DOM is immutable, so extraction filters instead of mutating.
pub fn element_text(root: ElementRef<'_>, separator: &str) -> String {
    let mut parts = Vec::new();
    collect_text(root, &mut parts);
    parts.join(separator)
}

fn collect_text(el: ElementRef<'_>, parts: &mut Vec<String>) {
    if NOISE_TAGS.contains(&el.value().name()) {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}
