//! crates/sous_core/src/session/mod.rs
//!
//! The cooking session: aggregate, timer, reducer, derived view and
//! persistence rules.

pub mod reducer;
pub mod snapshot;
pub mod state;
pub mod timer;
pub mod view;

pub use reducer::{reduce, Action, Direction, Rejection, SessionEvent, Transition};
pub use snapshot::{evaluate_snapshot, prepend_history, DiscardReason, SnapshotVerdict};
pub use state::{CompletionSummary, CookingSession, SessionState, SessionStatus, StepHistoryEntry};
pub use timer::{TimerPhase, TimerState};
pub use view::{format_timer, SessionView, TimerView};
