//! Polling trigger deduplication
//!
//! Turns a trigger's "list current items" call into an ordered feed of new
//! items across repeated polls, with durable cursor state per trigger key.

pub mod engine;
pub mod source;
pub mod store;

pub use engine::{Clock, DedupStrategy, PollingDedupEngine, SystemClock};
pub use source::{PollItem, PollingSource};
pub use store::{CursorStore, FileCursorStore, InMemoryCursorStore, PollCursor};
