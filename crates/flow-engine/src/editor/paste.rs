//! Pasting a copied operation list at a target location

use std::collections::{HashMap, HashSet};

use crate::config::EditorConfig;
use crate::editor::references::rewrite_references;
use crate::editor::{PasteTarget, SerializedOp};
use crate::error::{FlowError, Result};
use crate::navigation::{all_display_names, all_step_names, find_unused_name_with_prefix, get_step_or_err};
use crate::operations::{FlowOperation, StepPosition};
use crate::types::{Step, StepName};

/// Turn copied operations into add commands against `root`, using default settings
pub fn paste_steps(ops: &[SerializedOp], root: &Step, target: &PasteTarget) -> Result<Vec<FlowOperation>> {
    paste_steps_with_config(ops, root, target, &EditorConfig::default())
}

/// Turn copied operations into add commands against `root`.
///
/// Every pasted step gets a fresh name, references between pasted steps
/// follow the rename, and colliding display names get the copy suffix. The
/// first unanchored operation lands on `target`; later unanchored ones are
/// appended after the pasted top-level chain so they keep their order.
pub fn paste_steps_with_config(
    ops: &[SerializedOp],
    root: &Step,
    target: &PasteTarget,
    config: &EditorConfig,
) -> Result<Vec<FlowOperation>> {
    if ops.is_empty() {
        return Err(FlowError::invalid_selection("nothing to paste"));
    }
    if ops.iter().all(|op| op.parent_step_name.is_some()) {
        return Err(FlowError::invalid_selection(
            "pasted operations have no top-level step",
        ));
    }
    get_step_or_err(root, &target.parent_step)?;

    let renames = mint_names(ops, root, &config.step_name_prefix);
    let mut seen_display_names = all_display_names(root);
    let mut top_level: HashSet<&str> = HashSet::new();
    let mut tail: Option<StepName> = None;
    let mut commands = Vec::with_capacity(ops.len());

    for op in ops {
        let old_name = op.action.name.as_str();
        let new_name = renames
            .get(old_name)
            .cloned()
            .ok_or_else(|| FlowError::not_found(old_name))?;

        let (parent_step, position, branch_index) = match (&op.parent_step_name, &tail) {
            (None, None) => (target.parent_step.clone(), target.position, target.branch_index),
            (None, Some(tail)) => (tail.clone(), StepPosition::After, None),
            (Some(parent), _) => (
                renames.get(parent).cloned().unwrap_or_else(|| parent.clone()),
                op.position,
                op.branch_index,
            ),
        };

        let extends_top_level = match &op.parent_step_name {
            None => true,
            Some(parent) => op.position == StepPosition::After && top_level.contains(parent.as_str()),
        };
        if extends_top_level {
            top_level.insert(old_name);
            tail = Some(new_name.clone());
        }

        let mut display_name = op.action.display_name.clone();
        if seen_display_names.contains(&display_name) {
            display_name.push_str(&config.copy_suffix);
        }
        seen_display_names.insert(display_name.clone());

        let mut action = op.action.without_descendants();
        action.settings = rewrite_references(&op.action.settings, &renames)?;
        action.name = new_name;
        action.display_name = display_name;

        log::debug!(
            "Pasting '{}' as '{}' {:?} '{}'",
            old_name,
            action.name,
            position,
            parent_step
        );
        commands.push(FlowOperation::AddAction {
            parent_step,
            position,
            branch_index,
            action,
        });
    }

    Ok(commands)
}

/// Fresh names for every pasted step, seeded with the names already in the tree
fn mint_names(ops: &[SerializedOp], root: &Step, prefix: &str) -> HashMap<StepName, StepName> {
    let mut existing = all_step_names(root);
    let mut renames = HashMap::with_capacity(ops.len());
    for op in ops {
        let fresh = find_unused_name_with_prefix(&existing, prefix);
        existing.insert(fresh.clone());
        renames.insert(op.action.name.clone(), fresh);
    }
    renames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::editor::copy::copy_steps;
    use crate::fixtures::sample_flow;
    use crate::navigation::{branch_index_of, get_all_steps, get_step};
    use crate::operations::apply_operations;
    use crate::validation::validate_flow;
    use serde_json::json;

    fn select(names: &[&str]) -> Vec<StepName> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_trip_router_with_branch_and_successor() {
        // A router(2), B in branch 0, C after A
        let flow = FlowBuilder::new("flow-1", "Round trip")
            .add(Step::router("step_1", "A", 2).with_branch(0, Step::action("step_2", "B")))
            .add(Step::action("step_3", "C"))
            .build();

        let ops = copy_steps(&select(&["step_1", "step_2", "step_3"]), &flow.trigger).unwrap();
        let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::after("step_3")).unwrap();
        let outcome = apply_operations(&flow, &commands);
        assert!(outcome.is_complete());
        assert!(validate_flow(&outcome.flow).is_empty());

        let router = get_step(&outcome.flow.trigger, "step_4").unwrap();
        assert_eq!(router.display_name, "A Copy");
        assert_eq!(router.branch_count(), Some(2));
        assert_eq!(branch_index_of(router, "step_5"), Some(0));
        assert_eq!(router.next_action.as_deref().unwrap().name, "step_6");
        assert_eq!(
            get_step(&outcome.flow.trigger, "step_3")
                .unwrap()
                .next_action
                .as_deref()
                .unwrap()
                .name,
            "step_4"
        );
    }

    #[test]
    fn test_references_follow_renames() {
        let flow = sample_flow();
        let ops = copy_steps(&select(&["step_4", "step_5"]), &flow.trigger).unwrap();
        let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::after("step_10")).unwrap();

        let FlowOperation::AddAction { action, .. } = &commands[0] else {
            panic!("expected add");
        };
        // step_1 was not copied, so its reference is kept
        assert_eq!(action.name, "step_11");
        assert_eq!(action.settings, json!({"items": "{{step_1.rows}}"}));

        let FlowOperation::AddAction {
            action, parent_step, ..
        } = &commands[1]
        else {
            panic!("expected add");
        };
        assert_eq!(parent_step, "step_11");
        assert_eq!(action.settings, json!({"input": "{{step_11.item}}"}));
    }

    #[test]
    fn test_unanchored_ops_keep_left_to_right_order() {
        let flow = sample_flow();
        // No selected step is an ancestor of another, so all three are unanchored
        let ops = copy_steps(&select(&["step_3", "step_9", "step_10"]), &flow.trigger).unwrap();
        assert!(ops[0].parent_step_name.is_none());
        assert!(ops[1].parent_step_name.is_none());

        let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::inside_branch("step_2", 1)).unwrap();
        let outcome = apply_operations(&flow, &commands);
        assert!(outcome.is_complete());

        let router = get_step(&outcome.flow.trigger, "step_2").unwrap();
        let branch_head = router.children()[1];
        let chain: Vec<&str> = std::iter::successors(Some(branch_head), |s| s.next_action.as_deref())
            .map(|s| s.display_name.as_str())
            .collect();
        assert_eq!(chain, vec!["Check Copy", "Send Copy", "Report Copy"]);
    }

    #[test]
    fn test_display_name_collisions() {
        let flow = FlowBuilder::new("flow-1", "Names")
            .add(Step::action("step_1", "X"))
            .build();
        let ops: Vec<SerializedOp> = ["X", "X", "Y"]
            .iter()
            .enumerate()
            .map(|(i, display)| SerializedOp {
                action: Step::action(format!("step_{}", i + 10), *display),
                parent_step_name: None,
                position: StepPosition::After,
                branch_index: None,
            })
            .collect();

        let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::after("step_1")).unwrap();
        let display_names: Vec<String> = commands
            .iter()
            .filter_map(|command| match command {
                FlowOperation::AddAction { action, .. } => Some(action.display_name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(display_names, vec!["X Copy", "X Copy", "Y"]);
    }

    #[test]
    fn test_repeated_paste_keeps_names_unique() {
        let mut flow = sample_flow();
        let ops = copy_steps(&select(&["step_2", "step_3", "step_4", "step_5", "step_6"]), &flow.trigger)
            .unwrap();
        for _ in 0..3 {
            let commands = paste_steps(&ops, &flow.trigger, &PasteTarget::after("step_1")).unwrap();
            let outcome = apply_operations(&flow, &commands);
            assert!(outcome.is_complete());
            flow = outcome.flow;
            assert!(validate_flow(&flow).is_empty());
        }
        assert_eq!(get_all_steps(&flow.trigger).len(), 11 + 3 * 5);
    }

    #[test]
    fn test_configured_prefix_and_suffix() {
        let flow = sample_flow();
        let ops = copy_steps(&select(&["step_1"]), &flow.trigger).unwrap();
        let config = EditorConfig {
            step_name_prefix: "node".to_string(),
            copy_suffix: " (2)".to_string(),
            ..EditorConfig::default()
        };
        let commands =
            paste_steps_with_config(&ops, &flow.trigger, &PasteTarget::after("step_1"), &config).unwrap();
        let FlowOperation::AddAction { action, .. } = &commands[0] else {
            panic!("expected add");
        };
        assert_eq!(action.name, "node_1");
        assert_eq!(action.display_name, "Fetch rows (2)");
    }

    #[test]
    fn test_prefixed_copies_keep_references() {
        let config = EditorConfig {
            step_name_prefix: "my_step".to_string(),
            ..EditorConfig::default()
        };
        let flow = sample_flow();
        let ops = copy_steps(&select(&["step_4", "step_5"]), &flow.trigger).unwrap();
        let commands =
            paste_steps_with_config(&ops, &flow.trigger, &PasteTarget::after("step_10"), &config).unwrap();
        let flow = apply_operations(&flow, &commands).flow;

        // Copy the copies: their names now carry the configured prefix
        let ops = copy_steps(&select(&["my_step_1", "my_step_2"]), &flow.trigger).unwrap();
        let commands =
            paste_steps_with_config(&ops, &flow.trigger, &PasteTarget::after("my_step_1"), &config).unwrap();
        let flow = apply_operations(&flow, &commands).flow;

        let body = get_step(&flow.trigger, "my_step_4").unwrap();
        assert_eq!(body.settings, json!({"input": "{{my_step_3.item}}"}));
    }

    #[test]
    fn test_paste_errors() {
        let flow = sample_flow();
        assert!(matches!(
            paste_steps(&[], &flow.trigger, &PasteTarget::after("step_1")),
            Err(FlowError::InvalidSelection(_))
        ));

        let ops = copy_steps(&select(&["step_1"]), &flow.trigger).unwrap();
        assert!(matches!(
            paste_steps(&ops, &flow.trigger, &PasteTarget::after("missing")),
            Err(FlowError::StepNotFound(_))
        ));

        let anchored_only = vec![SerializedOp {
            parent_step_name: Some("step_1".to_string()),
            ..ops[0].clone()
        }];
        assert!(matches!(
            paste_steps(&anchored_only, &flow.trigger, &PasteTarget::after("step_1")),
            Err(FlowError::InvalidSelection(_))
        ));
    }
}
