//! Seine HTML - DOM processing and extraction.
//!
//! - **processor**: parsing, link extraction, noise-aware text collection
//! - **document**: main-content selection, text + Markdown, title
//! - **faq**: multi-strategy Q/A recognition and answer-mode classification

pub mod document;
pub mod faq;
pub mod processor;

pub use document::{DocumentExtractor, ExtractedDocument};
pub use faq::{classify_answer_mode, FaqCandidate, FaqExtractor, FaqStrategy};
pub use processor::{extract_links, parse_document};
