use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use seine_types::{AnswerMode, FaqItem};
use tracing::debug;

use crate::processor::element_text;

static DETAILS: Lazy<Selector> = Lazy::new(|| Selector::parse("details").expect("static selector"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("summary").expect("static selector"));
static DL: Lazy<Selector> = Lazy::new(|| Selector::parse("dl").expect("static selector"));
static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").expect("static selector"));
static ACCORDION_CARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".accordion-card").expect("static selector"));
static CARD_HEADER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".card-header").expect("static selector"));
static CARD_BUTTON: Lazy<Selector> = Lazy::new(|| Selector::parse("button").expect("static selector"));
static CARD_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".card-body").expect("static selector"));
static FAQ_QUESTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".faq_ques_text").expect("static selector"));
static FAQ_ANSWER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".faq-ans").expect("static selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+\d{1,2}\s)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}").expect("static regex")
});

/// Answers longer than this are considered resolved on the page itself.
const DIRECT_ANSWER_MIN_LEN: usize = 50;

/// One recognized question/answer pair, before classification.
#[derive(Debug, Clone)]
pub struct FaqCandidate {
    pub question: String,
    pub answer_text: String,
    pub answer_html: String,
}

/// A structural recognizer for one FAQ layout family.
pub trait FaqStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, doc: &Html) -> Vec<FaqCandidate>;
}

/// `<details><summary>Q</summary>A</details>` disclosure widgets. The
/// summary is excluded from the answer in both HTML and text form.
struct DisclosureWidgets;

impl FaqStrategy for DisclosureWidgets {
    fn name(&self) -> &'static str {
        "disclosure_widgets"
    }

    fn extract(&self, doc: &Html) -> Vec<FaqCandidate> {
        let mut candidates = Vec::new();
        for details in doc.select(&DETAILS) {
            let Some(summary) = details.select(&SUMMARY).next() else {
                continue;
            };
            let question = element_text(summary, " ");

            let mut html_parts = Vec::new();
            let mut text_parts = Vec::new();
            for child in details.children() {
                if child.id() == summary.id() {
                    continue;
                }
                match child.value() {
                    Node::Text(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            html_parts.push(trimmed.to_string());
                            text_parts.push(trimmed.to_string());
                        }
                    }
                    Node::Element(_) => {
                        if let Some(el) = ElementRef::wrap(child) {
                            html_parts.push(el.html());
                            let text = element_text(el, " ");
                            if !text.is_empty() {
                                text_parts.push(text);
                            }
                        }
                    }
                    _ => {}
                }
            }

            let answer_text = text_parts.join(" ");
            if question.is_empty() || answer_text.is_empty() {
                continue;
            }
            candidates.push(FaqCandidate {
                question,
                answer_text,
                answer_html: html_parts.join("").trim().to_string(),
            });
        }
        candidates
    }
}

/// `<dl>` definition lists: each `dt` paired with the next `dd` sibling.
struct DefinitionLists;

impl FaqStrategy for DefinitionLists {
    fn name(&self) -> &'static str {
        "definition_lists"
    }

    fn extract(&self, doc: &Html) -> Vec<FaqCandidate> {
        let mut candidates = Vec::new();
        for dl in doc.select(&DL) {
            for dt in dl.select(&DT) {
                let mut node = dt.next_sibling();
                let mut dd = None;
                while let Some(sibling) = node {
                    if let Some(el) = ElementRef::wrap(sibling) {
                        if el.value().name() == "dd" {
                            dd = Some(el);
                            break;
                        }
                    }
                    node = sibling.next_sibling();
                }
                let Some(dd) = dd else { continue };
                candidates.push(FaqCandidate {
                    question: element_text(dt, " "),
                    answer_text: element_text(dd, " "),
                    answer_html: dd.inner_html().trim().to_string(),
                });
            }
        }
        candidates
    }
}

/// Bootstrap-style `.accordion-card` blocks: question from the button in
/// `.card-header` (header text as fallback), answer from `.card-body`.
struct CardAccordions;

impl FaqStrategy for CardAccordions {
    fn name(&self) -> &'static str {
        "card_accordions"
    }

    fn extract(&self, doc: &Html) -> Vec<FaqCandidate> {
        let mut candidates = Vec::new();
        for card in doc.select(&ACCORDION_CARD) {
            let question = card
                .select(&CARD_HEADER)
                .next()
                .map(|header| {
                    header
                        .select(&CARD_BUTTON)
                        .next()
                        .map(|button| element_text(button, " "))
                        .unwrap_or_else(|| element_text(header, " "))
                })
                .unwrap_or_default();
            let Some(body) = card.select(&CARD_BODY).next() else {
                continue;
            };
            if question.is_empty() {
                continue;
            }
            candidates.push(FaqCandidate {
                question,
                answer_text: element_text(body, " "),
                answer_html: body.inner_html().trim().to_string(),
            });
        }
        candidates
    }
}

/// Custom paragraph pattern: a `.faq_ques_text` node whose parent holds a
/// `.faq-ans` descendant with the answer.
struct QuestionParagraphs;

impl FaqStrategy for QuestionParagraphs {
    fn name(&self) -> &'static str {
        "question_paragraphs"
    }

    fn extract(&self, doc: &Html) -> Vec<FaqCandidate> {
        let mut candidates = Vec::new();
        for question_el in doc.select(&FAQ_QUESTION) {
            let Some(parent) = question_el.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            let Some(answer) = parent.select(&FAQ_ANSWER).next() else {
                continue;
            };
            candidates.push(FaqCandidate {
                question: element_text(question_el, " "),
                answer_text: element_text(answer, " "),
                answer_html: answer.inner_html().trim().to_string(),
            });
        }
        candidates
    }
}

/// Ordered recognizer cascade. The first strategy returning any candidates
/// wins; strategies are never unioned, so a page mixing structures cannot
/// produce duplicate pairs.
pub struct FaqExtractor {
    strategies: Vec<Box<dyn FaqStrategy>>,
}

impl Default for FaqExtractor {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(DisclosureWidgets),
                Box::new(DefinitionLists),
                Box::new(CardAccordions),
                Box::new(QuestionParagraphs),
            ],
        }
    }
}

impl FaqExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, doc: &Html, url: &str) -> Vec<FaqItem> {
        for strategy in &self.strategies {
            let candidates = strategy.extract(doc);
            if candidates.is_empty() {
                continue;
            }
            debug!(
                url = %url,
                strategy = strategy.name(),
                count = candidates.len(),
                "FAQ candidates found"
            );
            return candidates
                .into_iter()
                .map(|candidate| {
                    let answer_mode =
                        classify_answer_mode(&candidate.answer_text, &candidate.answer_html);
                    let link_depth_to_answer =
                        if candidate.answer_text.len() > DIRECT_ANSWER_MIN_LEN {
                            Some(0)
                        } else {
                            None
                        };
                    FaqItem {
                        document_url: url.to_string(),
                        question_text: candidate.question,
                        answer_text: candidate.answer_text,
                        answer_raw_html: candidate.answer_html,
                        answer_mode,
                        link_depth_to_answer,
                    }
                })
                .collect();
        }
        Vec::new()
    }
}

/// Signals the mode rules inspect, computed once per answer.
struct AnswerSignals {
    hrefs: Vec<String>,
    anchor_count: usize,
    html_lower: String,
    text: String,
}

/// Priority-ordered predicate table: the first matching rule decides the
/// mode. A fixed table rather than nested conditionals keeps the
/// precedence auditable.
const MODE_RULES: &[(AnswerMode, fn(&AnswerSignals) -> bool)] = &[
    (AnswerMode::PortalRedirect, |s| {
        s.hrefs.iter().any(|h| h.contains("login") || h.contains("account"))
    }),
    (AnswerMode::PdfAttachment, |s| {
        s.hrefs.iter().any(|h| h.ends_with(".pdf"))
    }),
    (AnswerMode::Video, |s| {
        s.html_lower.contains("video") || s.html_lower.contains("transcript")
    }),
    (AnswerMode::PhoneEscalation, |s| PHONE_RE.is_match(&s.text)),
    (AnswerMode::LinkOut, |s| s.anchor_count > 0),
];

/// Classifies how a FAQ answer resolves, from its text and raw HTML.
pub fn classify_answer_mode(text: &str, html: &str) -> AnswerMode {
    let fragment = Html::parse_fragment(html);
    let anchors: Vec<_> = fragment.select(&ANCHOR).collect();
    let signals = AnswerSignals {
        hrefs: anchors
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_ascii_lowercase)
            .collect(),
        anchor_count: anchors.len(),
        html_lower: html.to_ascii_lowercase(),
        text: text.to_string(),
    };
    for (mode, rule) in MODE_RULES {
        if rule(&signals) {
            return *mode;
        }
    }
    AnswerMode::DirectText
}
