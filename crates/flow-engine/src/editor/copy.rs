//! Copying a selection into a flat, replayable operation list

use std::collections::HashSet;

use crate::editor::SerializedOp;
use crate::error::{FlowError, Result};
use crate::navigation::{branch_index_of, find_path_to_step, get_all_steps, get_step_or_err, is_child_of};
use crate::operations::StepPosition;
use crate::types::{Step, StepKind, StepName};

/// Serialize the selected steps into single-step operations.
///
/// Steps are emitted in tree order, each stripped of its successor and
/// structural children. A step is anchored to its nearest selected ancestor;
/// steps without one are anchored to the paste target later. Triggers are
/// never copied.
pub fn copy_steps(selected: &[StepName], root: &Step) -> Result<Vec<SerializedOp>> {
    for name in selected {
        get_step_or_err(root, name)?;
    }
    let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();

    let steps: Vec<&Step> = get_all_steps(root)
        .into_iter()
        .filter(|step| wanted.contains(step.name.as_str()))
        .filter(|step| {
            if step.is_trigger() {
                log::debug!("Skipping trigger '{}' in copy selection", step.name);
            }
            !step.is_trigger()
        })
        .collect();

    if steps.is_empty() {
        return Err(FlowError::invalid_selection("no copyable steps selected"));
    }

    steps
        .into_iter()
        .map(|step| serialize_step(step, &wanted, root))
        .collect()
}

fn serialize_step(step: &Step, wanted: &HashSet<&str>, root: &Step) -> Result<SerializedOp> {
    let path = find_path_to_step(root, &step.name)?;
    let anchor = path
        .iter()
        .rev()
        .skip(1)
        .find(|candidate| !candidate.is_trigger() && wanted.contains(candidate.name.as_str()));

    let (parent_step_name, position, branch_index) = match anchor {
        None => (None, StepPosition::After, None),
        Some(anchor) if is_child_of(anchor, &step.name) => match &anchor.kind {
            StepKind::LoopOnItems { .. } => (Some(anchor.name.clone()), StepPosition::InsideLoop, None),
            StepKind::Router { .. } => (
                Some(anchor.name.clone()),
                StepPosition::InsideBranch,
                branch_index_of(anchor, &step.name),
            ),
            StepKind::Trigger | StepKind::Action => {
                (Some(anchor.name.clone()), StepPosition::After, None)
            }
        },
        Some(anchor) => (Some(anchor.name.clone()), StepPosition::After, None),
    };

    Ok(SerializedOp {
        action: step.without_descendants(),
        parent_step_name,
        position,
        branch_index,
    })
}
