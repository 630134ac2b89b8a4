//! Step output lookup for runs with nested loop iterations
//!
//! The execution engine records outputs flat at the top level for steps that
//! are not inside any loop. A step inside a loop only appears in the output map
//! of one iteration of that loop (`output.iterations[i]`), recursively for
//! nested loops. This module maps that record back onto the tree shape.
//!
//! # Key Concepts
//!
//! - **Execution path**: the `(loop, iteration)` pairs to descend through, outermost first
//! - **Iteration selection**: the iteration picked per loop (defaults to 0)
//! - **Missing output is not an error**: a step inside a loop iteration that
//!   has not run yet simply has no output

use std::collections::HashMap;

use crate::error::Result;
use crate::navigation::{find_structural_ancestors, get_all_steps, is_child_of};
use crate::types::{RunOutputs, RunSnapshot, RunStatus, Step, StepName, StepOutput, StepStatus};

/// Iteration index chosen per loop step
pub type LoopIterationSelection = HashMap<StepName, usize>;

/// `(loop step name, iteration index)` pairs from the root down to a step
pub type ExecutionPath = Vec<(StepName, usize)>;

/// Compute the loops to descend through to reach `step_name`, outermost first.
///
/// Each loop is paired with its selected iteration, or 0 when none was picked.
/// Fails with `StepNotFound` if the step is not in the tree.
pub fn execution_path(
    step_name: &str,
    selection: &LoopIterationSelection,
    root: &Step,
) -> Result<ExecutionPath> {
    let ancestors = find_structural_ancestors(root, step_name)?;
    Ok(ancestors
        .into_iter()
        .filter(|step| step.is_loop())
        .map(|step| {
            let index = selection.get(&step.name).copied().unwrap_or(0);
            (step.name.clone(), index)
        })
        .collect())
}

/// Resolve the output of `step_name` for the selected loop iterations.
///
/// Returns `None` when the step has not produced output under that selection:
/// a loop that has not run, has zero iterations, or has fewer iterations than
/// the selected index. Unknown step names also yield `None`.
pub fn extract_step_output<'a>(
    step_name: &str,
    selection: &LoopIterationSelection,
    run_outputs: &'a RunOutputs,
    root: &Step,
) -> Option<&'a StepOutput> {
    if let Some(output) = run_outputs.get(step_name) {
        return Some(output);
    }

    let path = match execution_path(step_name, selection, root) {
        Ok(path) => path,
        Err(e) => {
            log::debug!("No output lookup for '{}': {}", step_name, e);
            return None;
        }
    };

    let mut current = run_outputs;
    for (loop_name, index) in &path {
        current = current.get(loop_name)?.iterations()?.get(*index)?;
    }
    current.get(step_name)
}

/// The per-iteration output maps of a loop step, if the loop has produced output
pub fn loop_iterations<'a>(
    loop_name: &str,
    selection: &LoopIterationSelection,
    run_outputs: &'a RunOutputs,
    root: &Step,
) -> Option<&'a [RunOutputs]> {
    extract_step_output(loop_name, selection, run_outputs, root)?.iterations()
}

/// Name of the step that failed the run.
///
/// Uses the name reported by the engine when present; otherwise searches the
/// outputs in tree order for a failed step, preferring failures inside loop
/// iterations (latest iteration first) over the loop step that carries them.
pub fn find_failed_step(run: &RunSnapshot, root: &Step) -> Option<StepName> {
    run.failed_step_name
        .clone()
        .or_else(|| find_failed_in(&run.steps, root))
}

fn find_failed_in(outputs: &RunOutputs, root: &Step) -> Option<StepName> {
    get_all_steps(root).into_iter().find_map(|step| {
        let output = outputs.get(&step.name)?;
        let nested = output.iterations().and_then(|iterations| {
            iterations
                .iter()
                .rev()
                .find_map(|iteration| find_failed_in(iteration, root))
        });
        match nested {
            Some(found) => Some(found),
            None if output.status == StepStatus::Failed => Some(step.name.clone()),
            None => None,
        }
    })
}

/// Recompute the iteration selection after the run's outputs changed.
///
/// Loops are visited outermost first so inner loops resolve under the indices
/// already chosen for their ancestors:
/// - a loop containing the failed step of a failed run focuses its last iteration
/// - otherwise a previously chosen index is kept
/// - otherwise a loop whose output is now available starts at iteration 0
///
/// Loops with no output are left out, except that previous choices are carried
/// over while the run is still in progress.
pub fn find_loops_state(
    previous: &LoopIterationSelection,
    run: &RunSnapshot,
    root: &Step,
) -> LoopIterationSelection {
    let failed_step = if run.status == RunStatus::Failed {
        find_failed_step(run, root)
    } else {
        None
    };

    let mut state = LoopIterationSelection::new();
    for step in get_all_steps(root).into_iter().filter(|s| s.is_loop()) {
        let Some(iterations) = loop_iterations(&step.name, &state, &run.steps, root) else {
            if !run.status.is_terminal() {
                if let Some(index) = previous.get(&step.name) {
                    state.insert(step.name.clone(), *index);
                }
            }
            continue;
        };

        let contains_failure = failed_step
            .as_deref()
            .is_some_and(|failed| is_child_of(step, failed));

        let index = if contains_failure {
            iterations.len().saturating_sub(1)
        } else {
            previous.get(&step.name).copied().unwrap_or(0)
        };
        state.insert(step.name.clone(), index);
    }
    state
}
