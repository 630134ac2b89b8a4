//! An editable flow with focus and undo history

use crate::config::EditorConfig;
use crate::editor::{
    copy_steps, duplicate_step_with_config, paste_steps_with_config, ClipboardPayload, EditorState,
    PasteTarget,
};
use crate::error::{FlowError, Result};
use crate::navigation::get_step;
use crate::operations::{apply_operations, FlowOperation};
use crate::types::{FlowVersion, StepName};
use crate::undo::UndoStack;

/// A flow being edited.
///
/// Paste, delete and duplicate plan their operations against the current
/// flow and replay them; the flow they replaced goes onto the undo history.
pub struct EditSession {
    flow: FlowVersion,
    state: EditorState,
    history: UndoStack,
    config: EditorConfig,
}

impl EditSession {
    pub fn new(flow: FlowVersion, config: EditorConfig) -> Self {
        Self {
            flow,
            state: EditorState::new(),
            history: UndoStack::from_config(&config),
            config,
        }
    }

    pub fn flow(&self) -> &FlowVersion {
        &self.flow
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Focus a step of the current flow
    pub fn focus(&mut self, name: &str) -> Result<()> {
        if get_step(&self.flow.trigger, name).is_none() {
            return Err(FlowError::not_found(name));
        }
        self.state.focus(name);
        Ok(())
    }

    pub fn copy(&self, selected: &[StepName]) -> Result<ClipboardPayload> {
        Ok(ClipboardPayload::new(copy_steps(selected, &self.flow.trigger)?))
    }

    /// Paste a clipboard at `target`, returning the operations that failed
    pub fn paste(&mut self, payload: &ClipboardPayload, target: &PasteTarget) -> Result<Vec<(usize, FlowError)>> {
        let commands = paste_steps_with_config(&payload.operations, &self.flow.trigger, target, &self.config)?;
        self.commit(&commands)
    }

    pub fn delete(&mut self, selected: &[StepName]) -> Result<Vec<(usize, FlowError)>> {
        let commands = self.state.delete_steps(selected, &self.flow.trigger)?;
        self.commit(&commands)
    }

    pub fn duplicate(&mut self, name: &str) -> Result<Vec<(usize, FlowError)>> {
        let commands = duplicate_step_with_config(name, &self.flow.trigger, &self.config)?;
        self.commit(&commands)
    }

    /// Go back one edit. Returns `false` with nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo(&self.flow)? {
            Some(previous) => {
                self.replace(previous);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reapply the last undone edit. Returns `false` with nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo(&self.flow)? {
            Some(next) => {
                self.replace(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replay planned operations. A batch where nothing applied leaves the
    /// flow and the history untouched.
    fn commit(&mut self, commands: &[FlowOperation]) -> Result<Vec<(usize, FlowError)>> {
        let outcome = apply_operations(&self.flow, commands);
        if outcome.failures.len() == commands.len() {
            log::warn!(
                "No operation applied to flow '{}'; history unchanged",
                self.flow.id
            );
            return Ok(outcome.failures);
        }
        self.history.record(&self.flow)?;
        self.replace(outcome.flow);
        Ok(outcome.failures)
    }

    fn replace(&mut self, flow: FlowVersion) {
        self.flow = flow;
        if let Some(focused) = &self.state.focused_step {
            if get_step(&self.flow.trigger, focused).is_none() {
                log::debug!("Clearing focus on missing step '{}'", focused);
                self.state.focused_step = None;
            }
        }
    }
}
