//! Shared step trees for unit tests

use serde_json::json;

use crate::builder::FlowBuilder;
use crate::types::{FlowVersion, Step};

/// ```text
/// trigger
/// step_1  Fetch rows
/// step_2  Route            (router, 2 branches)
///   [0] step_3  Check
///       step_4  Each row   (loop)
///         step_5  Transform
///         step_6  Store
///   [1] (empty)
/// step_7  Outer            (loop)
///   step_8  Inner          (loop)
///     step_9  Send
/// step_10 Report
/// ```
pub(crate) fn sample_flow() -> FlowVersion {
    FlowBuilder::new("flow-1", "Sample")
        .add(Step::action("step_1", "Fetch rows").with_settings(json!({"table": "orders"})))
        .add(
            Step::router("step_2", "Route", 2).with_branch(
                0,
                Step::action("step_3", "Check").then(
                    Step::loop_on_items("step_4", "Each row")
                        .with_settings(json!({"items": "{{step_1.rows}}"}))
                        .with_body(
                            Step::action("step_5", "Transform")
                                .with_settings(json!({"input": "{{step_4.item}}"}))
                                .then(Step::action("step_6", "Store")),
                        ),
                ),
            ),
        )
        .add(
            Step::loop_on_items("step_7", "Outer").with_body(
                Step::loop_on_items("step_8", "Inner").with_body(Step::action("step_9", "Send")),
            ),
        )
        .add(Step::action("step_10", "Report"))
        .build()
}

/// Names in traversal order
pub(crate) fn names(steps: &[&Step]) -> Vec<String> {
    steps.iter().map(|s| s.name.clone()).collect()
}
