//! Rewriting of step references embedded in settings
//!
//! Settings reference other steps through template blocks such as
//! `{{step_7.output.rows[0]}}`. When steps are pasted under fresh names,
//! references to copied steps must follow the rename; every other reference
//! is kept byte-for-byte, dangling ones included.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::Result;
use crate::types::StepName;

/// A `{{ ... }}` template block (never spans a JSON string boundary)
static TEMPLATE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("template block pattern is valid"));

/// An identifier run inside a template block; only runs naming a renamed step change
static STEP_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("step token pattern is valid"));

/// Rewrite step references in a text through `renames`
pub fn rewrite_text(text: &str, renames: &HashMap<StepName, StepName>) -> String {
    TEMPLATE_BLOCK
        .replace_all(text, |block: &Captures| {
            STEP_TOKEN
                .replace_all(&block[0], |token: &Captures| {
                    renames
                        .get(&token[0])
                        .cloned()
                        .unwrap_or_else(|| token[0].to_string())
                })
                .into_owned()
        })
        .into_owned()
}

/// Rewrite step references anywhere in a settings payload.
///
/// The payload is rewritten as JSON text, so references in keys and nested
/// values are covered alike.
pub fn rewrite_references(settings: &Value, renames: &HashMap<StepName, StepName>) -> Result<Value> {
    if renames.is_empty() || settings.is_null() {
        return Ok(settings.clone());
    }
    let text = serde_json::to_string(settings)?;
    let rewritten = rewrite_text(&text, renames);
    if rewritten == text {
        return Ok(settings.clone());
    }
    Ok(serde_json::from_str(&rewritten)?)
}
