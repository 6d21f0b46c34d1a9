//! Seine Spider - the crawl engine.
//!
//! - **canonical**: deterministic URL identity for deduplication
//! - **artifacts**: hashed filenames, commit-before-reference writes
//! - **engine**: the per-URL pipeline (dequeue, policy gates, fetch,
//!   dispatch, persist, enqueue children) and its resume semantics

pub mod artifacts;
pub mod canonical;
pub mod engine;

pub use artifacts::ArtifactWriter;
pub use canonical::Canonicalizer;
pub use engine::CrawlEngine;
