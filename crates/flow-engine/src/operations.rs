//! Single-step mutation commands and their application to flow versions
//!
//! Every command produces a new `FlowVersion`; the input value is never
//! modified. Commands are the unit the editor's copy/paste/delete planners
//! emit, and batches are replayed strictly in order.

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::navigation::{all_step_names, get_all_steps, get_step, is_child_of};
use crate::types::{FlowVersion, Step, StepKind, StepName};

/// Where a step is inserted relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepPosition {
    /// As the parent's successor (the old successor follows the new step)
    After,
    /// As the head of the parent loop's body
    InsideLoop,
    /// As the head of one of the parent router's branches
    InsideBranch,
}

/// A single structural mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowOperation {
    /// Insert a step (and any chain hanging off it) at a location
    #[serde(rename_all = "camelCase")]
    AddAction {
        parent_step: StepName,
        position: StepPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_index: Option<usize>,
        action: Step,
    },
    /// Remove a step together with its branches, loop body and successor chain
    #[serde(rename_all = "camelCase")]
    DeleteAction { name: StepName },
    /// Relocate a step with its branches or loop body; its successor takes its old place
    #[serde(rename_all = "camelCase")]
    MoveAction {
        name: StepName,
        new_parent_step: StepName,
        position: StepPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_index: Option<usize>,
    },
}

impl FlowOperation {
    /// Add `action` as the successor of `parent`
    pub fn add_after(parent: impl Into<String>, action: Step) -> Self {
        Self::AddAction {
            parent_step: parent.into(),
            position: StepPosition::After,
            branch_index: None,
            action,
        }
    }

    /// Add `action` as the head of the body of loop `parent`
    pub fn add_inside_loop(parent: impl Into<String>, action: Step) -> Self {
        Self::AddAction {
            parent_step: parent.into(),
            position: StepPosition::InsideLoop,
            branch_index: None,
            action,
        }
    }

    /// Add `action` as the head of branch `branch_index` of router `parent`
    pub fn add_inside_branch(parent: impl Into<String>, branch_index: usize, action: Step) -> Self {
        Self::AddAction {
            parent_step: parent.into(),
            position: StepPosition::InsideBranch,
            branch_index: Some(branch_index),
            action,
        }
    }

    /// Delete the named step and everything it owns
    pub fn delete(name: impl Into<String>) -> Self {
        Self::DeleteAction { name: name.into() }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddAction { .. } => "add",
            Self::DeleteAction { .. } => "delete",
            Self::MoveAction { .. } => "move",
        }
    }
}

/// Result of replaying a batch of operations
#[derive(Debug)]
pub struct BatchOutcome {
    /// The flow after every operation that succeeded
    pub flow: FlowVersion,
    /// Index and error of every operation that failed
    pub failures: Vec<(usize, FlowError)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply one operation, returning the new flow version
pub fn apply_operation(flow: &FlowVersion, operation: &FlowOperation) -> Result<FlowVersion> {
    let mut next = flow.clone();
    match operation {
        FlowOperation::AddAction {
            parent_step,
            position,
            branch_index,
            action,
        } => add_action(&mut next.trigger, parent_step, *position, *branch_index, action.clone())?,
        FlowOperation::DeleteAction { name } => delete_action(&mut next.trigger, name)?,
        FlowOperation::MoveAction {
            name,
            new_parent_step,
            position,
            branch_index,
        } => move_action(&mut next.trigger, name, new_parent_step, *position, *branch_index)?,
    }
    Ok(next)
}

/// Apply operations one by one, continuing past failures.
///
/// Earlier operations stay applied when a later one fails; the failures are
/// reported in the outcome so the caller can decide what to do next.
pub fn apply_operations(flow: &FlowVersion, operations: &[FlowOperation]) -> BatchOutcome {
    let mut current = flow.clone();
    let mut failures = Vec::new();
    for (index, operation) in operations.iter().enumerate() {
        match apply_operation(&current, operation) {
            Ok(next) => current = next,
            Err(e) => {
                log::warn!(
                    "Operation {} ({}) failed on flow '{}': {}",
                    index,
                    operation.label(),
                    flow.id,
                    e
                );
                failures.push((index, e));
            }
        }
    }
    BatchOutcome {
        flow: current,
        failures,
    }
}

fn add_action(
    root: &mut Step,
    parent_step: &str,
    position: StepPosition,
    branch_index: Option<usize>,
    action: Step,
) -> Result<()> {
    let existing = all_step_names(root);
    let mut incoming = std::collections::HashSet::new();
    for step in get_all_steps(&action) {
        if step.is_trigger() {
            return Err(FlowError::invalid_operation(format!(
                "cannot add trigger '{}' as an action",
                step.name
            )));
        }
        if existing.contains(&step.name) || !incoming.insert(step.name.as_str()) {
            return Err(FlowError::invalid_operation(format!(
                "step name '{}' is already used",
                step.name
            )));
        }
    }

    let parent = get_step_mut(root, parent_step).ok_or_else(|| FlowError::not_found(parent_step))?;
    log::debug!(
        "Adding '{}' {:?} '{}'",
        action.name,
        position,
        parent.name
    );
    insert_at(parent, position, branch_index, action)
}

fn delete_action(root: &mut Step, name: &str) -> Result<()> {
    if root.name == name {
        return Err(FlowError::invalid_operation("the trigger cannot be deleted"));
    }
    let slot = owning_slot_mut(root, name).ok_or_else(|| FlowError::not_found(name))?;
    if let Some(removed) = slot.take() {
        log::debug!(
            "Deleted '{}' and {} owned steps",
            removed.name,
            get_all_steps(&removed).len() - 1
        );
    }
    Ok(())
}

fn move_action(
    root: &mut Step,
    name: &str,
    new_parent_step: &str,
    position: StepPosition,
    branch_index: Option<usize>,
) -> Result<()> {
    if root.name == name {
        return Err(FlowError::invalid_operation("the trigger cannot be moved"));
    }
    let moving = get_step(root, name).ok_or_else(|| FlowError::not_found(name))?;
    if get_step(root, new_parent_step).is_none() {
        return Err(FlowError::not_found(new_parent_step));
    }
    if new_parent_step == name || is_child_of(moving, new_parent_step) {
        return Err(FlowError::invalid_operation(format!(
            "cannot move '{}' into its own subtree",
            name
        )));
    }

    let slot = owning_slot_mut(root, name).ok_or_else(|| FlowError::not_found(name))?;
    let Some(mut detached) = slot.take() else {
        return Err(FlowError::not_found(name));
    };
    *slot = detached.next_action.take();

    let parent = get_step_mut(root, new_parent_step)
        .ok_or_else(|| FlowError::not_found(new_parent_step))?;
    insert_at(parent, position, branch_index, *detached)
}

/// Insert `step` (with any chain hanging off it) into the slot selected by `position`.
///
/// The slot's previous occupant is appended after the inserted chain.
fn insert_at(
    parent: &mut Step,
    position: StepPosition,
    branch_index: Option<usize>,
    mut step: Step,
) -> Result<()> {
    let slot = match position {
        StepPosition::After => &mut parent.next_action,
        StepPosition::InsideLoop => match &mut parent.kind {
            StepKind::LoopOnItems { first_loop_action } => first_loop_action,
            other => {
                return Err(FlowError::invalid_operation(format!(
                    "'{}' is a {}, not a loop",
                    parent.name,
                    other.label()
                )))
            }
        },
        StepPosition::InsideBranch => match &mut parent.kind {
            StepKind::Router { branches } => {
                let count = branches.len();
                let index = branch_index.ok_or_else(|| {
                    FlowError::invalid_operation(format!(
                        "missing branch index for router '{}'",
                        parent.name
                    ))
                })?;
                match branches.get_mut(index) {
                    Some(branch) => &mut branch.first_action,
                    None => {
                        return Err(FlowError::invalid_operation(format!(
                            "branch {} out of range for router '{}' with {} branches",
                            index, parent.name, count
                        )))
                    }
                }
            }
            other => {
                return Err(FlowError::invalid_operation(format!(
                    "'{}' is a {}, not a router",
                    parent.name,
                    other.label()
                )))
            }
        },
    };

    if let Some(previous) = slot.take() {
        append_to_chain(&mut step, previous);
    }
    *slot = Some(Box::new(step));
    Ok(())
}

fn append_to_chain(step: &mut Step, tail: Box<Step>) {
    match &mut step.next_action {
        Some(next) => append_to_chain(next, tail),
        None => step.next_action = Some(tail),
    }
}

/// Mutable lookup by name
pub(crate) fn get_step_mut<'a>(step: &'a mut Step, name: &str) -> Option<&'a mut Step> {
    if step.name == name {
        return Some(step);
    }
    let Step {
        kind, next_action, ..
    } = step;
    match kind {
        StepKind::Router { branches } => {
            for branch in branches.iter_mut() {
                if let Some(head) = branch.first_action.as_deref_mut() {
                    if let Some(found) = get_step_mut(head, name) {
                        return Some(found);
                    }
                }
            }
        }
        StepKind::LoopOnItems { first_loop_action } => {
            if let Some(head) = first_loop_action.as_deref_mut() {
                if let Some(found) = get_step_mut(head, name) {
                    return Some(found);
                }
            }
        }
        StepKind::Trigger | StepKind::Action => {}
    }
    next_action
        .as_deref_mut()
        .and_then(|next| get_step_mut(next, name))
}

/// The edge (successor, branch or loop-body slot) that owns the named step
fn owning_slot_mut<'a>(step: &'a mut Step, name: &str) -> Option<&'a mut Option<Box<Step>>> {
    let Step {
        kind, next_action, ..
    } = step;
    match kind {
        StepKind::Router { branches } => {
            for branch in branches.iter_mut() {
                if let Some(found) = search_slot(&mut branch.first_action, name) {
                    return Some(found);
                }
            }
        }
        StepKind::LoopOnItems { first_loop_action } => {
            if let Some(found) = search_slot(first_loop_action, name) {
                return Some(found);
            }
        }
        StepKind::Trigger | StepKind::Action => {}
    }
    search_slot(next_action, name)
}

fn search_slot<'a>(
    slot: &'a mut Option<Box<Step>>,
    name: &str,
) -> Option<&'a mut Option<Box<Step>>> {
    if slot.as_ref().is_some_and(|step| step.name == name) {
        return Some(slot);
    }
    slot.as_deref_mut()
        .and_then(|step| owning_slot_mut(step, name))
}
