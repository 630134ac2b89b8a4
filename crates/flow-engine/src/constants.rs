//! Shared constants

/// Default values used by configuration types
pub mod defaults {
    /// Prefix for generated step names (`step_1`, `step_2`, ...)
    pub const STEP_NAME_PREFIX: &str = "step";

    /// Suffix appended to a pasted step's display name on collision
    pub const COPY_SUFFIX: &str = " Copy";

    /// Name of the trigger step in a fresh flow version
    pub const TRIGGER_NAME: &str = "trigger";

    /// Display name of the trigger step in a fresh flow version
    pub const TRIGGER_DISPLAY_NAME: &str = "Select Trigger";

    /// Maximum number of undo snapshots kept by the editor
    pub const MAX_UNDO_SNAPSHOTS: usize = 100;

    /// Maximum number of items returned by a polling `test()` call
    pub const POLLING_SAMPLE_LIMIT: usize = 5;
}
