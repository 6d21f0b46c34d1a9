use serde::{Deserialize, Serialize};

use crate::status::QueueStatus;

/// One row of the durable frontier. The queue table is the resume log:
/// there is no in-memory mirror acting as source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub url: String,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub status: QueueStatus,
    pub priority: i64,
    pub attempts: u32,
}
