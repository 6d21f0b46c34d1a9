use crate::status::CrawlStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kinds of on-disk artifacts a crawl can produce for a document.
///
/// The set is closed on purpose: artifact paths are persisted as a JSON
/// object keyed by these names, and unknown kinds should fail loudly at
/// the application boundary instead of accumulating silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Html,
    Md,
    Pdf,
    PdfText,
    Video,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Md => "md",
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::PdfText => "pdf_text",
            ArtifactKind::Video => "video",
        }
    }
}

/// Mapping of artifact kind to the relative path written for a document.
///
/// Serialized to a compact JSON object on the `local_artifact_paths`
/// column; round-trips losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPaths(BTreeMap<ArtifactKind, String>);

impl ArtifactPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ArtifactKind, path: String) {
        self.0.insert(kind, path);
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactKind, &String)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Structured meta bag stored on the `meta_tags` column.
///
/// Currently carries the FAQ-page flag; serde defaults leave room for
/// future booleans without breaking stored rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaTags {
    #[serde(default)]
    pub is_faq_page: bool,
}

impl MetaTags {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// One row in the `documents` table: a URL ever considered for fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    pub canonical_url: Option<String>,
    pub status: CrawlStatus,
    pub depth_from_seed: Option<u32>,
    pub url_path: Option<String>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub extracted_text: Option<String>,
    pub local_artifact_paths: ArtifactPaths,
    pub crawled_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub meta_tags: MetaTags,
}

impl DocumentRecord {
    /// A minimal record carrying only identity and outcome; used for
    /// policy rejections and fetch failures.
    pub fn new(url: impl Into<String>, status: CrawlStatus) -> Self {
        Self {
            url: url.into(),
            canonical_url: None,
            status,
            depth_from_seed: None,
            url_path: None,
            content_type: None,
            title: None,
            extracted_text: None,
            local_artifact_paths: ArtifactPaths::new(),
            crawled_at: None,
            error_message: None,
            meta_tags: MetaTags::default(),
        }
    }
}
