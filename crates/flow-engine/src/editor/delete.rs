//! Deleting selected steps

use std::collections::HashSet;

use crate::editor::EditorState;
use crate::error::{FlowError, Result};
use crate::navigation::{get_all_steps, get_step_or_err};
use crate::operations::FlowOperation;
use crate::types::{Step, StepName};

impl EditorState {
    /// Plan the deletion of the selected steps.
    ///
    /// Deleting a step removes everything it owns, so selected steps that are
    /// already covered by an earlier deletion get no command of their own.
    /// Focus is cleared when the focused step is among the removed steps.
    pub fn delete_steps(&mut self, selected: &[StepName], root: &Step) -> Result<Vec<FlowOperation>> {
        for name in selected {
            get_step_or_err(root, name)?;
        }
        let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();

        let mut removed: HashSet<&str> = HashSet::new();
        let mut commands = Vec::new();
        for step in get_all_steps(root) {
            if !wanted.contains(step.name.as_str()) || removed.contains(step.name.as_str()) {
                continue;
            }
            if step.is_trigger() {
                log::debug!("Skipping trigger '{}' in delete selection", step.name);
                continue;
            }
            removed.extend(get_all_steps(step).into_iter().map(|s| s.name.as_str()));
            commands.push(FlowOperation::delete(step.name.clone()));
        }

        if commands.is_empty() {
            return Err(FlowError::invalid_selection("no deletable steps selected"));
        }

        if let Some(focused) = &self.focused_step {
            if removed.contains(focused.as_str()) {
                log::debug!("Clearing focus on deleted step '{}'", focused);
                self.focused_step = None;
            }
        }
        Ok(commands)
    }
}
