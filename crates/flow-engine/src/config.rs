//! Configuration types for the flow engine

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::error::Result;

/// Settings for the structural editor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Prefix used when minting fresh step names
    pub step_name_prefix: String,
    /// Suffix appended to a pasted display name that collides with an existing one
    pub copy_suffix: String,
    /// Number of snapshots kept for undo/redo
    pub max_undo_snapshots: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            step_name_prefix: defaults::STEP_NAME_PREFIX.to_string(),
            copy_suffix: defaults::COPY_SUFFIX.to_string(),
            max_undo_snapshots: defaults::MAX_UNDO_SNAPSHOTS,
        }
    }
}

/// Settings for polling triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollingConfig {
    /// Maximum number of items returned by a sample-data `test()` call
    pub sample_limit: usize,
    /// Directory for file-backed cursor persistence (in-memory when unset)
    pub cursor_dir: Option<PathBuf>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            sample_limit: defaults::POLLING_SAMPLE_LIMIT,
            cursor_dir: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowEngineConfig {
    pub editor: EditorConfig,
    pub polling: PollingConfig,
}

impl FlowEngineConfig {
    /// Load configuration from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        log::debug!("Loaded flow engine config from {:?}", path.as_ref());
        Ok(config)
    }
}
