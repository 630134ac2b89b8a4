//! Fluent builders for step trees
//!
//! Provides a compact API for constructing flow versions programmatically.
//!
//! # Example
//!
//! ```ignore
//! let flow = FlowBuilder::new("flow-1", "Sync orders")
//!     .add(Step::action("step_1", "Fetch orders"))
//!     .add(
//!         Step::loop_on_items("step_2", "For each order")
//!             .with_body(Step::action("step_3", "Upsert row")),
//!     )
//!     .build();
//! ```

use crate::constants::defaults;
use crate::types::{FlowVersion, RouterBranch, Step, StepKind};

impl Step {
    fn new(name: impl Into<String>, display_name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            settings: serde_json::Value::Null,
            kind,
            next_action: None,
        }
    }

    /// Create a trigger step
    pub fn trigger(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(name, display_name, StepKind::Trigger)
    }

    /// Create a plain action step
    pub fn action(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(name, display_name, StepKind::Action)
    }

    /// Create a router with `branch_count` empty branches named `Branch 1`, `Branch 2`, ...
    pub fn router(name: impl Into<String>, display_name: impl Into<String>, branch_count: usize) -> Self {
        let branches = (1..=branch_count)
            .map(|i| RouterBranch {
                branch_name: format!("Branch {}", i),
                first_action: None,
            })
            .collect();
        Self::new(name, display_name, StepKind::Router { branches })
    }

    /// Create a loop-on-items step with an empty body
    pub fn loop_on_items(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(
            name,
            display_name,
            StepKind::LoopOnItems {
                first_loop_action: None,
            },
        )
    }

    /// Set the settings payload
    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }

    /// Set the successor of this step
    pub fn then(mut self, next: Step) -> Self {
        self.next_action = Some(Box::new(next));
        self
    }

    /// Set the head of a router branch
    ///
    /// Ignored (with a warning) if this step is not a router or the index is out of range.
    pub fn with_branch(mut self, index: usize, head: Step) -> Self {
        if let StepKind::Router { branches } = &mut self.kind {
            if let Some(branch) = branches.get_mut(index) {
                branch.first_action = Some(Box::new(head));
                return self;
            }
        }
        log::warn!(
            "with_branch({}) ignored on {} step '{}'",
            index,
            self.kind.label(),
            self.name
        );
        self
    }

    /// Set the head of a loop body
    ///
    /// Ignored (with a warning) if this step is not a loop.
    pub fn with_body(mut self, head: Step) -> Self {
        if let StepKind::LoopOnItems { first_loop_action } = &mut self.kind {
            *first_loop_action = Some(Box::new(head));
            return self;
        }
        log::warn!("with_body ignored on {} step '{}'", self.kind.label(), self.name);
        self
    }

    /// Link steps into a chain, returning its head
    pub fn chain(steps: Vec<Step>) -> Option<Step> {
        steps.into_iter().rev().fold(None, |next, mut step| {
            if let Some(next) = next {
                step.next_action = Some(Box::new(next));
            }
            Some(step)
        })
    }
}

/// Fluent builder for a flow version's top-level chain
pub struct FlowBuilder {
    id: String,
    display_name: String,
    trigger: Step,
    chain: Vec<Step>,
}

impl FlowBuilder {
    /// Create a new flow builder with a default trigger
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            trigger: Step::trigger(defaults::TRIGGER_NAME, defaults::TRIGGER_DISPLAY_NAME),
            chain: Vec::new(),
        }
    }

    /// Replace the trigger step (its successor is discarded)
    pub fn with_trigger(mut self, trigger: Step) -> Self {
        self.trigger = trigger;
        self
    }

    /// Append a step to the top-level chain
    pub fn add(mut self, step: Step) -> Self {
        self.chain.push(step);
        self
    }

    /// Build the flow version without validation
    pub fn build(self) -> FlowVersion {
        let mut trigger = self.trigger;
        trigger.next_action = Step::chain(self.chain).map(Box::new);
        FlowVersion::with_trigger(self.id, self.display_name, trigger)
    }
}
