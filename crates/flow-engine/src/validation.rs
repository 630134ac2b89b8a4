//! Structural validation for flow versions
//!
//! Checks the invariants every mutation must preserve: a trigger at the
//! root only, non-empty and unique step names, and routers with at least
//! one branch. Acyclicity holds by construction (owned edges).

use std::collections::HashSet;

use crate::navigation::get_all_steps;
use crate::types::{FlowVersion, StepKind};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The root step is not a trigger
    RootNotTrigger { name: String },
    /// A trigger appears below the root
    NestedTrigger { name: String },
    /// Two steps share a name
    DuplicateStepName { name: String },
    /// A step has an empty name
    EmptyStepName { display_name: String },
    /// A router was created without branches
    RouterWithoutBranches { name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotTrigger { name } => {
                write!(f, "Root step '{}' is not a trigger", name)
            }
            Self::NestedTrigger { name } => {
                write!(f, "Trigger '{}' is nested below the root", name)
            }
            Self::DuplicateStepName { name } => {
                write!(f, "Step name '{}' is used more than once", name)
            }
            Self::EmptyStepName { display_name } => {
                write!(f, "Step '{}' has an empty name", display_name)
            }
            Self::RouterWithoutBranches { name } => {
                write!(f, "Router '{}' has no branches", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a flow version
///
/// Returns all validation errors found (not just the first).
pub fn validate_flow(flow: &FlowVersion) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !flow.trigger.is_trigger() {
        errors.push(ValidationError::RootNotTrigger {
            name: flow.trigger.name.clone(),
        });
    }

    let mut seen = HashSet::new();
    for (position, step) in get_all_steps(&flow.trigger).into_iter().enumerate() {
        if position > 0 && step.is_trigger() {
            errors.push(ValidationError::NestedTrigger {
                name: step.name.clone(),
            });
        }
        if step.name.is_empty() {
            errors.push(ValidationError::EmptyStepName {
                display_name: step.display_name.clone(),
            });
        } else if !seen.insert(step.name.as_str()) {
            errors.push(ValidationError::DuplicateStepName {
                name: step.name.clone(),
            });
        }
        if let StepKind::Router { branches } = &step.kind {
            if branches.is_empty() {
                errors.push(ValidationError::RouterWithoutBranches {
                    name: step.name.clone(),
                });
            }
        }
    }

    errors
}
