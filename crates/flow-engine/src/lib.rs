//! Flow Engine - step trees, structural editing and polling triggers
//!
//! A flow is a tree of steps rooted at a trigger. Steps chain through their
//! successor, routers own one chain per branch and loops own the chain of
//! their body. This crate provides:
//!
//! - The step tree model and read-only navigation over it
//! - Output lookup for runs whose steps ran inside nested loop iterations
//! - Copy, paste, duplicate and delete planned as replayable operations
//! - Edit sessions with compressed snapshot undo/redo
//! - Deduplication for polling triggers with durable cursors
//!
//! # Architecture
//!
//! Tree values are never mutated in place. Editor commands produce
//! [`FlowOperation`]s and [`apply_operations`] replays them onto a copy:
//!
//! ```ignore
//! use flow_engine::{apply_operations, copy_steps, paste_steps, PasteTarget};
//!
//! let ops = copy_steps(&["step_2".to_string()], &flow.trigger)?;
//! let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::after("step_5"))?;
//! let outcome = apply_operations(&flow, &commands);
//! ```

pub mod builder;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod journal;
pub mod navigation;
pub mod operations;
pub mod polling;
pub mod types;
pub mod undo;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key types
pub use builder::FlowBuilder;
pub use config::{EditorConfig, FlowEngineConfig, PollingConfig};
pub use editor::{
    copy_steps, duplicate_step, duplicate_step_with_config, paste_steps, paste_steps_with_config,
    ClipboardPayload, EditSession, EditorState, PasteTarget, SerializedOp,
};
pub use error::{FlowError, Result};
pub use journal::{
    execution_path, extract_step_output, find_failed_step, find_loops_state, loop_iterations,
    ExecutionPath, LoopIterationSelection,
};
pub use navigation::{find_path_to_step, find_unused_name, get_all_steps, get_step, is_child_of};
pub use operations::{apply_operation, apply_operations, BatchOutcome, FlowOperation, StepPosition};
pub use polling::{
    Clock, CursorStore, DedupStrategy, FileCursorStore, InMemoryCursorStore, PollCursor, PollItem,
    PollingDedupEngine, PollingSource, SystemClock,
};
pub use types::{
    FlowVersion, LoopOutput, OutputValue, RouterBranch, RunOutputs, RunSnapshot, RunStatus, Step,
    StepKind, StepName, StepOutput, StepStatus,
};
pub use undo::UndoStack;
pub use validation::{validate_flow, ValidationError};
