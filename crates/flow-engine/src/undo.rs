//! Edit history over flow versions
//!
//! The live version is held by the caller (see
//! [`EditSession`](crate::editor::session::EditSession)); this module only keeps
//! the versions it replaced. Past versions sit on the undo side, versions that
//! were undone sit on the redo side, and each is stored as zstd-compressed JSON.

use std::collections::VecDeque;

use crate::config::EditorConfig;
use crate::error::{FlowError, Result};
use crate::types::FlowVersion;

const COMPRESSION_LEVEL: i32 = 3;

/// One compressed flow version
struct Snapshot {
    flow_id: String,
    bytes: Vec<u8>,
}

impl Snapshot {
    fn capture(flow: &FlowVersion) -> Result<Self> {
        let json = serde_json::to_vec(flow)?;
        let bytes = zstd::encode_all(&json[..], COMPRESSION_LEVEL)
            .map_err(|e| FlowError::Compression(format!("flow '{}': {}", flow.id, e)))?;
        Ok(Self {
            flow_id: flow.id.clone(),
            bytes,
        })
    }

    fn restore(&self) -> Result<FlowVersion> {
        let json = zstd::decode_all(&self.bytes[..])
            .map_err(|e| FlowError::Compression(format!("flow '{}': {}", self.flow_id, e)))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Undo and redo sides of an edit history
pub struct UndoStack {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    limit: usize,
}

impl UndoStack {
    /// Keep at most `limit` past versions (at least 1)
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.max_undo_snapshots)
    }

    /// Remember `replaced` as the version before a new edit.
    ///
    /// A new edit makes the redo side unreachable, so it is dropped.
    pub fn record(&mut self, replaced: &FlowVersion) -> Result<()> {
        self.past.push_back(Snapshot::capture(replaced)?);
        if self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
        Ok(())
    }

    /// Swap `current` for the previous version.
    ///
    /// Returns `Ok(None)` with nothing to undo. A snapshot that fails to
    /// restore stays in place.
    pub fn undo(&mut self, current: &FlowVersion) -> Result<Option<FlowVersion>> {
        let Some(previous) = self.past.back().map(Snapshot::restore).transpose()? else {
            return Ok(None);
        };
        self.future.push(Snapshot::capture(current)?);
        self.past.pop_back();
        Ok(Some(previous))
    }

    /// Swap `current` for the version that was last undone
    pub fn redo(&mut self, current: &FlowVersion) -> Result<Option<FlowVersion>> {
        let Some(next) = self.future.last().map(Snapshot::restore).transpose()? else {
            return Ok(None);
        };
        self.past.push_back(Snapshot::capture(current)?);
        self.future.pop();
        Ok(Some(next))
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of versions that can be undone
    pub fn depth(&self) -> usize {
        self.past.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}
