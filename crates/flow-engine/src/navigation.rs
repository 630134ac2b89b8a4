//! Read-only algorithms over step trees
//!
//! All traversals are pre-order: a step, then its structural children
//! (router branches in index order, or the loop body), then its successor.
//! Successor chains are walked iteratively; recursion only happens when
//! descending into branches and loop bodies.

use std::collections::HashSet;

use crate::constants::defaults;
use crate::error::{FlowError, Result};
use crate::types::{Step, StepKind};

/// Find a step by name in the tree rooted at `root`
pub fn get_step<'a>(root: &'a Step, name: &str) -> Option<&'a Step> {
    let mut current = Some(root);
    while let Some(step) = current {
        if step.name == name {
            return Some(step);
        }
        for child in step.children() {
            if let Some(found) = get_step(child, name) {
                return Some(found);
            }
        }
        current = step.next_action.as_deref();
    }
    None
}

/// Find a step by name, failing with `StepNotFound` if absent
pub fn get_step_or_err<'a>(root: &'a Step, name: &str) -> Result<&'a Step> {
    get_step(root, name).ok_or_else(|| FlowError::not_found(name))
}

/// All steps of the tree in traversal order
pub fn get_all_steps(root: &Step) -> Vec<&Step> {
    let mut steps = Vec::new();
    collect_steps(root, &mut steps);
    steps
}

fn collect_steps<'a>(root: &'a Step, out: &mut Vec<&'a Step>) {
    let mut current = Some(root);
    while let Some(step) = current {
        out.push(step);
        for child in step.children() {
            collect_steps(child, out);
        }
        current = step.next_action.as_deref();
    }
}

/// Names of every step in the tree
pub fn all_step_names(root: &Step) -> HashSet<String> {
    get_all_steps(root).into_iter().map(|s| s.name.clone()).collect()
}

/// Display names of every step in the tree
pub fn all_display_names(root: &Step) -> HashSet<String> {
    get_all_steps(root)
        .into_iter()
        .map(|s| s.display_name.clone())
        .collect()
}

/// Every step visited on the way from `root` to the named step, including it.
///
/// The path holds both structural ancestors (routers and loops containing the
/// step) and the predecessors of each chain the walk passes through.
pub fn find_path_to_step<'a>(root: &'a Step, name: &str) -> Result<Vec<&'a Step>> {
    let mut path = Vec::new();
    if walk_to(root, name, &mut path) {
        Ok(path)
    } else {
        Err(FlowError::not_found(name))
    }
}

fn walk_to<'a>(root: &'a Step, name: &str, path: &mut Vec<&'a Step>) -> bool {
    let start = path.len();
    let mut current = Some(root);
    while let Some(step) = current {
        path.push(step);
        if step.name == name {
            return true;
        }
        for child in step.children() {
            if walk_to(child, name, path) {
                return true;
            }
        }
        current = step.next_action.as_deref();
    }
    path.truncate(start);
    false
}

/// Whether `descendant_name` lives inside a branch or the loop body of `ancestor`.
///
/// Steps in the ancestor's own successor chain are siblings, not children.
pub fn is_child_of(ancestor: &Step, descendant_name: &str) -> bool {
    ancestor
        .children()
        .into_iter()
        .any(|child| get_step(child, descendant_name).is_some())
}

/// Index of the router branch whose subtree contains `descendant_name`
pub fn branch_index_of(router: &Step, descendant_name: &str) -> Option<usize> {
    match &router.kind {
        StepKind::Router { branches } => branches.iter().position(|branch| {
            branch
                .first_action
                .as_deref()
                .is_some_and(|head| get_step(head, descendant_name).is_some())
        }),
        _ => None,
    }
}

/// Structural ancestors (routers and loops containing the step), outermost first
pub fn find_structural_ancestors<'a>(root: &'a Step, name: &str) -> Result<Vec<&'a Step>> {
    let path = find_path_to_step(root, name)?;
    Ok(path
        .into_iter()
        .filter(|candidate| is_child_of(candidate, name))
        .collect())
}

/// Smallest unused `step_N` name (N starting at 1)
pub fn find_unused_name(existing: &HashSet<String>) -> String {
    find_unused_name_with_prefix(existing, defaults::STEP_NAME_PREFIX)
}

/// Smallest unused `{prefix}_N` name (N starting at 1)
///
/// Names minted for a batch must be added to `existing` before asking again.
pub fn find_unused_name_with_prefix(existing: &HashSet<String>, prefix: &str) -> String {
    (1..)
        .map(|i| format!("{}_{}", prefix, i))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| format!("{}_{}", prefix, existing.len() + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{names, sample_flow};

    #[test]
    fn test_get_all_steps_preorder() {
        let flow = sample_flow();
        let all = get_all_steps(&flow.trigger);
        assert_eq!(
            names(&all),
            vec![
                "trigger", "step_1", "step_2", "step_3", "step_4", "step_5", "step_6", "step_7",
                "step_8", "step_9", "step_10"
            ]
        );
    }

    #[test]
    fn test_get_step() {
        let flow = sample_flow();
        assert_eq!(get_step(&flow.trigger, "step_9").unwrap().display_name, "Send");
        assert!(get_step(&flow.trigger, "step_99").is_none());

        let err = get_step_or_err(&flow.trigger, "step_99").unwrap_err();
        assert!(matches!(err, FlowError::StepNotFound(name) if name == "step_99"));
    }

    #[test]
    fn test_find_path_to_step() {
        let flow = sample_flow();
        let path = find_path_to_step(&flow.trigger, "step_6").unwrap();
        assert_eq!(
            names(&path),
            vec!["trigger", "step_1", "step_2", "step_3", "step_4", "step_5", "step_6"]
        );

        // Earlier siblings that do not contain the target are not kept
        let path = find_path_to_step(&flow.trigger, "step_10").unwrap();
        assert_eq!(
            names(&path),
            vec!["trigger", "step_1", "step_2", "step_7", "step_10"]
        );

        assert!(matches!(
            find_path_to_step(&flow.trigger, "missing"),
            Err(FlowError::StepNotFound(_))
        ));
    }

    #[test]
    fn test_is_child_of_excludes_successors() {
        let flow = sample_flow();
        let router = get_step(&flow.trigger, "step_2").unwrap();
        assert!(is_child_of(router, "step_3"));
        assert!(is_child_of(router, "step_6"));
        assert!(!is_child_of(router, "step_7"));
        assert!(!is_child_of(router, "step_2"));

        let inner = get_step(&flow.trigger, "step_8").unwrap();
        assert!(is_child_of(inner, "step_9"));

        let action = get_step(&flow.trigger, "step_1").unwrap();
        assert!(!is_child_of(action, "step_2"));
    }

    #[test]
    fn test_branch_index_and_structural_ancestors() {
        let flow = sample_flow();
        let router = get_step(&flow.trigger, "step_2").unwrap();
        assert_eq!(branch_index_of(router, "step_5"), Some(0));
        assert_eq!(branch_index_of(router, "step_10"), None);

        let ancestors = find_structural_ancestors(&flow.trigger, "step_5").unwrap();
        assert_eq!(names(&ancestors), vec!["step_2", "step_4"]);

        let ancestors = find_structural_ancestors(&flow.trigger, "step_9").unwrap();
        assert_eq!(names(&ancestors), vec!["step_7", "step_8"]);
    }

    #[test]
    fn test_find_unused_name() {
        let mut existing: HashSet<String> = ["step_1", "step_2", "step_4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let first = find_unused_name(&existing);
        assert_eq!(first, "step_3");
        existing.insert(first);
        assert_eq!(find_unused_name(&existing), "step_5");
        assert_eq!(find_unused_name_with_prefix(&existing, "trigger"), "trigger_1");
    }
}
