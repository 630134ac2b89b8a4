//! The "list current items" seam of a polling trigger

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One item returned by a polling source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollItem {
    /// Identifier used by the last-item strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Timestamp used by the time-based strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_ms: Option<i64>,
    /// The item itself, emitted as the trigger payload
    #[serde(default)]
    pub data: Value,
}

impl PollItem {
    /// An item identified by id
    pub fn with_id(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            epoch_ms: None,
            data,
        }
    }

    /// An item identified by timestamp
    pub fn with_epoch(epoch_ms: i64, data: Value) -> Self {
        Self {
            id: None,
            epoch_ms: Some(epoch_ms),
            data,
        }
    }
}

/// Samples the current items of an external system.
///
/// Implementations wrap a connector call. For the last-item strategy the
/// list must be ordered newest first.
#[async_trait]
pub trait PollingSource: Send + Sync {
    /// List the items currently visible in the source
    async fn list_items(&self) -> Result<Vec<PollItem>>;
}

#[async_trait]
impl<T: PollingSource + ?Sized> PollingSource for std::sync::Arc<T> {
    async fn list_items(&self) -> Result<Vec<PollItem>> {
        (**self).list_items().await
    }
}
