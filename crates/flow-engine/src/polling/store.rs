//! Durable cursor storage keyed by trigger instance
//!
//! Cursors are small records created on enable, replaced after every
//! successful poll and deleted on disable. The scheduler decides where they
//! live; this module ships an in-memory store and a directory of JSON files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::PollingConfig;
use crate::error::{FlowError, Result};

/// Resume state of one polling trigger instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollCursor {
    /// Id of the newest item seen so far
    #[serde(rename_all = "camelCase")]
    LastItem { last_item_id: Option<String> },
    /// Largest item timestamp seen so far (or the enable time)
    #[serde(rename_all = "camelCase")]
    Timebased { last_seen_epoch_ms: i64 },
}

/// Keyed storage for poll cursors
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<PollCursor>>;

    /// Store a cursor; it must be durable once this returns
    async fn put(&self, key: &str, cursor: PollCursor) -> Result<()>;

    /// Remove a cursor (no-op when absent)
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: CursorStore + ?Sized> CursorStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<PollCursor>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, cursor: PollCursor) -> Result<()> {
        (**self).put(key, cursor).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

/// Cursor store backed by a map, for tests and single-process schedulers
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    cursors: RwLock<HashMap<String, PollCursor>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.cursors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cursors.read().await.is_empty()
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn get(&self, key: &str) -> Result<Option<PollCursor>> {
        Ok(self.cursors.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, cursor: PollCursor) -> Result<()> {
        self.cursors.write().await.insert(key.to_string(), cursor);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cursors.write().await.remove(key);
        Ok(())
    }
}

/// Cursor store keeping one JSON file per trigger key in a directory.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    dir: PathBuf,
}

impl FileCursorStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Build the store named by the polling settings, if they name a directory
    pub fn from_config(config: &PollingConfig) -> Option<Self> {
        config.cursor_dir.as_ref().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn get(&self, key: &str) -> Result<Option<PollCursor>> {
        let file_path = self.file_path(key);
        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cursor = serde_json::from_str(&content).map_err(|e| {
            FlowError::Store(format!("corrupt cursor file {:?}: {}", file_path, e))
        })?;
        Ok(Some(cursor))
    }

    async fn put(&self, key: &str, cursor: PollCursor) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_path = self.file_path(key);
        let tmp_path = file_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&cursor)?;
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &file_path).await?;
        log::debug!("Saved cursor for '{}' to {:?}", key, file_path);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.file_path(key);
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => {
                log::debug!("Deleted cursor for '{}' from {:?}", key, file_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
