use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored status string cannot be interpreted.
#[derive(Debug, Error)]
#[error("unrecognized status string: {0}")]
pub struct StatusParseError(pub String);

/// Terminal outcome of processing a single URL, recorded on the document row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CrawlStatus {
    /// Fetched and processed successfully.
    Crawled,
    /// Denied by the host's robots.txt.
    BlockedByRobots,
    /// URL path matched an excluded section.
    SkippedByPolicy,
    /// Response content type not in the configured allowlist.
    UnsupportedType,
    /// Non-200 response, carrying the status code.
    Http(u16),
    /// Network failure after retries were exhausted.
    FetchError,
    /// Failure inside extraction or artifact writing.
    ProcessingError,
    /// Media bytes could not be saved.
    VideoUnavailable,
    /// Unknown failure caught at the engine's top level.
    Error,
}

impl CrawlStatus {
    /// Whether this status fails the queue row rather than completing it.
    ///
    /// Policy outcomes (robots, section, content type) complete the row;
    /// fetch and processing failures fail it so operators can triage.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CrawlStatus::Http(_)
                | CrawlStatus::FetchError
                | CrawlStatus::ProcessingError
                | CrawlStatus::VideoUnavailable
                | CrawlStatus::Error
        )
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlStatus::Crawled => write!(f, "CRAWLED"),
            CrawlStatus::BlockedByRobots => write!(f, "BLOCKED_BY_ROBOTS"),
            CrawlStatus::SkippedByPolicy => write!(f, "SKIPPED_BY_POLICY"),
            CrawlStatus::UnsupportedType => write!(f, "UNSUPPORTED_TYPE"),
            CrawlStatus::Http(code) => write!(f, "HTTP_{}", code),
            CrawlStatus::FetchError => write!(f, "FETCH_ERROR"),
            CrawlStatus::ProcessingError => write!(f, "PROCESSING_ERROR"),
            CrawlStatus::VideoUnavailable => write!(f, "VIDEO_UNAVAILABLE"),
            CrawlStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for CrawlStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRAWLED" => Ok(CrawlStatus::Crawled),
            "BLOCKED_BY_ROBOTS" => Ok(CrawlStatus::BlockedByRobots),
            "SKIPPED_BY_POLICY" => Ok(CrawlStatus::SkippedByPolicy),
            "UNSUPPORTED_TYPE" => Ok(CrawlStatus::UnsupportedType),
            "FETCH_ERROR" => Ok(CrawlStatus::FetchError),
            "PROCESSING_ERROR" => Ok(CrawlStatus::ProcessingError),
            "VIDEO_UNAVAILABLE" => Ok(CrawlStatus::VideoUnavailable),
            "ERROR" => Ok(CrawlStatus::Error),
            other => match other.strip_prefix("HTTP_") {
                Some(code) => code
                    .parse::<u16>()
                    .map(CrawlStatus::Http)
                    .map_err(|_| StatusParseError(other.to_string())),
                None => Err(StatusParseError(other.to_string())),
            },
        }
    }
}

impl From<CrawlStatus> for String {
    fn from(status: CrawlStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for CrawlStatus {
    type Error = StatusParseError;

    fn try_from(value: String) -> Result<Self, StatusParseError> {
        value.parse()
    }
}

/// Lifecycle of a frontier row. Transitions are monotonic within an attempt:
/// `pending -> processing -> {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "completed" => Ok(QueueStatus::Completed),
            "failed" => Ok(QueueStatus::Failed),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}
