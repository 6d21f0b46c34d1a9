//! Seine Types - Shared data model for the Seine site harvester
//!
//! Plain data structures shared across the workspace:
//!
//! - **Documents**: crawl results keyed by canonical URL, with artifact
//!   paths and meta tags modeled as closed value types
//! - **FAQ items**: question/answer pairs with answer-mode classification
//! - **Link graph**: outbound edges and downloadable assets
//! - **Frontier**: durable queue rows and their status lifecycle

pub mod document;
pub mod faq;
pub mod graph;
pub mod queue;
pub mod status;

pub use document::{ArtifactKind, ArtifactPaths, DocumentRecord, MetaTags};
pub use faq::{AnswerMode, FaqItem};
pub use graph::{AssetKind, AssetRecord, LinkEdge, PageLink};
pub use queue::QueueItem;
pub use status::{CrawlStatus, QueueStatus, StatusParseError};
