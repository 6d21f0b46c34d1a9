//! Seine Fetch - the HTTP side of the crawler.
//!
//! - **Fetcher**: reqwest GET with retry, backoff, and request spacing
//! - **RetryPolicy**: status-set driven retry with exponential backoff
//! - **RequestSpacer**: process-wide minimum delay between requests
//! - **RobotsPolicy**: per-host cached robots.txt permission checks

pub mod fetch;
pub mod limiter;
pub mod retry;
pub mod robots;

pub use fetch::{FetchError, Fetcher};
pub use limiter::RequestSpacer;
pub use retry::RetryPolicy;
pub use robots::RobotsPolicy;
