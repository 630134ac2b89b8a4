//! Core types for flow versions and run outputs
//!
//! A flow version is a tree of steps rooted at a single trigger. Every step
//! owns its successor (`next_action`); routers additionally own one chain per
//! branch and loops own the chain of their body. Owned `Box` edges make the
//! tree acyclic by construction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Unique name of a step within a flow version (e.g. `step_3`)
pub type StepName = String;

/// A node in the step tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Stable identity, also the token other steps reference in their settings
    pub name: StepName,
    /// Human-readable label (not required to be unique)
    pub display_name: String,
    /// Opaque payload owned by the execution engine
    #[serde(default)]
    pub settings: serde_json::Value,
    /// Kind of step and its structural children
    #[serde(flatten)]
    pub kind: StepKind,
    /// Step that runs after this one (and after its children resolve)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Step>>,
}

/// The closed set of step kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    /// The root of the tree
    Trigger,
    /// A plain action (connector call, code step, ...)
    Action,
    /// Mutually exclusive branches with a fixed arity
    #[serde(rename_all = "camelCase")]
    Router { branches: Vec<RouterBranch> },
    /// A body chain executed once per item
    #[serde(rename_all = "camelCase")]
    LoopOnItems {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_loop_action: Option<Box<Step>>,
    },
}

impl StepKind {
    /// Short label for logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Router { .. } => "router",
            Self::LoopOnItems { .. } => "loop",
        }
    }
}

/// One branch slot of a router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterBranch {
    pub branch_name: String,
    /// Head of the branch chain; `None` for an empty branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_action: Option<Box<Step>>,
}

impl Step {
    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, StepKind::Trigger)
    }

    pub fn is_router(&self) -> bool {
        matches!(self.kind, StepKind::Router { .. })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, StepKind::LoopOnItems { .. })
    }

    /// Structural children in traversal order: router branches by index, or the loop body
    pub fn children(&self) -> Vec<&Step> {
        match &self.kind {
            StepKind::Router { branches } => branches
                .iter()
                .filter_map(|b| b.first_action.as_deref())
                .collect(),
            StepKind::LoopOnItems { first_loop_action } => {
                first_loop_action.as_deref().into_iter().collect()
            }
            StepKind::Trigger | StepKind::Action => Vec::new(),
        }
    }

    /// Number of branches if this step is a router
    pub fn branch_count(&self) -> Option<usize> {
        match &self.kind {
            StepKind::Router { branches } => Some(branches.len()),
            _ => None,
        }
    }

    /// A copy of this step with its successor and all structural children removed.
    ///
    /// Routers keep their branch arity and branch names; every branch is emptied.
    pub fn without_descendants(&self) -> Step {
        let kind = match &self.kind {
            StepKind::Router { branches } => StepKind::Router {
                branches: branches
                    .iter()
                    .map(|b| RouterBranch {
                        branch_name: b.branch_name.clone(),
                        first_action: None,
                    })
                    .collect(),
            },
            StepKind::LoopOnItems { .. } => StepKind::LoopOnItems {
                first_loop_action: None,
            },
            other => other.clone(),
        };
        Step {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            settings: self.settings.clone(),
            kind,
            next_action: None,
        }
    }
}

/// A versioned flow: one trigger and everything hanging off it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowVersion {
    pub id: String,
    pub display_name: String,
    pub trigger: Step,
}

impl FlowVersion {
    /// Create a fresh flow version holding only an empty trigger
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.into(),
            trigger: Step::trigger(defaults::TRIGGER_NAME, defaults::TRIGGER_DISPLAY_NAME),
        }
    }

    /// Create a flow version around an existing trigger tree
    pub fn with_trigger(id: impl Into<String>, display_name: impl Into<String>, trigger: Step) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            trigger,
        }
    }
}

/// Status of a single step in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Running,
    Succeeded,
    Failed,
    Paused,
    Stopped,
}

/// Output of one step in one run (or one loop iteration of a run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub status: StepStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StepOutput {
    /// A succeeded output carrying a plain JSON value
    pub fn succeeded(output: serde_json::Value) -> Self {
        Self {
            status: StepStatus::Succeeded,
            duration_ms: 0,
            input: serde_json::Value::Null,
            output: Some(OutputValue::Json(output)),
            error_message: None,
        }
    }

    /// A failed output with an error message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failed,
            duration_ms: 0,
            input: serde_json::Value::Null,
            output: None,
            error_message: Some(message.into()),
        }
    }

    /// A loop output holding one output map per executed iteration
    pub fn looped(status: StepStatus, iterations: Vec<RunOutputs>) -> Self {
        Self {
            status,
            duration_ms: 0,
            input: serde_json::Value::Null,
            output: Some(OutputValue::Loop(LoopOutput {
                item: serde_json::Value::Null,
                index: iterations.len().saturating_sub(1),
                iterations,
            })),
            error_message: None,
        }
    }

    /// Per-iteration output maps, if this is a loop output
    pub fn iterations(&self) -> Option<&[RunOutputs]> {
        match &self.output {
            Some(OutputValue::Loop(output)) => Some(&output.iterations),
            _ => None,
        }
    }
}

/// Payload of a step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// Output of a loop step
    Loop(LoopOutput),
    /// Anything else
    Json(serde_json::Value),
}

/// Output recorded for a loop-on-items step
///
/// Only an exact loop record parses as this type; any other object stays
/// opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoopOutput {
    /// Item of the last executed iteration
    #[serde(default)]
    pub item: serde_json::Value,
    /// Index of the last executed iteration
    #[serde(default)]
    pub index: usize,
    /// One output map per executed iteration, in execution order
    pub iterations: Vec<RunOutputs>,
}

/// Step outputs keyed by step name
pub type RunOutputs = HashMap<StepName, StepOutput>;

/// Status of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Paused,
    Succeeded,
    Failed,
    Timeout,
    Stopped,
}

impl RunStatus {
    /// Whether the run has finished and its outputs will not change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running | Self::Paused)
    }
}

/// Snapshot of a run as reported by the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub status: RunStatus,
    #[serde(default)]
    pub steps: RunOutputs,
    /// Name of the step that failed the run, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step_name: Option<StepName>,
}
