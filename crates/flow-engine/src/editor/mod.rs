//! Structural editing: copy, paste, duplicate and delete
//!
//! The editor never mutates a tree itself. Each command plans a list of
//! [`FlowOperation`]s that the caller replays with
//! [`apply_operations`](crate::operations::apply_operations).
//!
//! Copy flattens a selection into [`SerializedOp`]s, one per step, each
//! anchored to the nearest selected ancestor. Paste replays that list at a
//! target with fresh names and rewritten references. [`EditSession`] owns a
//! flow and applies those plans to it with undo history.

pub mod copy;
pub mod delete;
pub mod paste;
pub mod references;
pub mod session;

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::Result;
use crate::navigation::{get_all_steps, get_step_or_err};
use crate::operations::{FlowOperation, StepPosition};
use crate::types::{Step, StepName};

pub use copy::copy_steps;
pub use paste::{paste_steps, paste_steps_with_config};
pub use references::rewrite_references;
pub use session::EditSession;

/// One copied step and where it hangs relative to the other copied steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedOp {
    /// The step without successor or structural children
    pub action: Step,
    /// Nearest selected ancestor; `None` means "attach at the paste target"
    pub parent_step_name: Option<StepName>,
    pub position: StepPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_index: Option<usize>,
}

/// Clipboard contents: the JSON text of a copied operation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipboardPayload {
    pub operations: Vec<SerializedOp>,
}

impl ClipboardPayload {
    pub fn new(operations: Vec<SerializedOp>) -> Self {
        Self { operations }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where pasted steps are attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteTarget {
    pub parent_step: StepName,
    pub position: StepPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_index: Option<usize>,
}

impl PasteTarget {
    pub fn after(parent: impl Into<String>) -> Self {
        Self {
            parent_step: parent.into(),
            position: StepPosition::After,
            branch_index: None,
        }
    }

    pub fn inside_loop(parent: impl Into<String>) -> Self {
        Self {
            parent_step: parent.into(),
            position: StepPosition::InsideLoop,
            branch_index: None,
        }
    }

    pub fn inside_branch(parent: impl Into<String>, branch_index: usize) -> Self {
        Self {
            parent_step: parent.into(),
            position: StepPosition::InsideBranch,
            branch_index: Some(branch_index),
        }
    }
}

/// Editor UI state that commands must keep consistent with the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    /// Step currently focused in the editor, if any
    pub focused_step: Option<StepName>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, name: impl Into<String>) {
        self.focused_step = Some(name.into());
    }
}

/// Plan a copy of a step and everything inside its branches or loop body,
/// pasted directly after the step.
pub fn duplicate_step(name: &str, root: &Step) -> Result<Vec<FlowOperation>> {
    duplicate_step_with_config(name, root, &EditorConfig::default())
}

pub fn duplicate_step_with_config(name: &str, root: &Step, config: &EditorConfig) -> Result<Vec<FlowOperation>> {
    let step = get_step_or_err(root, name)?;
    let selected: Vec<StepName> = std::iter::once(step)
        .chain(step.children().into_iter().flat_map(get_all_steps))
        .map(|s| s.name.clone())
        .collect();

    let ops = copy_steps(&selected, root)?;
    paste_steps_with_config(&ops, root, &PasteTarget::after(name), config)
}
