//! Client-side reconciliation of server snapshots with optimistic local state.
//!
//! # Module Structure
//!
//! - `tracked`: per-record reconciliation (`Reconciler`, `ReconcilerMap`)
//! - `thread`: append-only conversation thread merge (`ConversationThread`)

mod thread;
mod tracked;

pub use thread::{ConversationThread, MATCH_WINDOW_SECS};
pub use tracked::{
    DEFAULT_MALFORMED_THRESHOLD, MalformedStreak, Observation, Reconciler, ReconcilerMap,
    TrackedSnapshot,
};
