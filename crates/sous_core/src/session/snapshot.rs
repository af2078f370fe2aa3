//! crates/sous_core/src/session/snapshot.rs
//!
//! Decides what to do with a persisted session blob and maintains the
//! bounded completion history. Storage itself happens elsewhere.

use super::state::{CompletionSummary, CookingSession, SessionStatus};
use chrono::{DateTime, Duration, Utc};

/// Key holding the live session blob.
pub const ACTIVE_SESSION_KEY: &str = "cooking_session.active";
/// Key holding the completion history, newest first.
pub const SESSION_HISTORY_KEY: &str = "cooking_session.history";
/// Key holding the user's data-collection preferences.
pub const PREFERENCES_KEY: &str = "preferences.data_collection";
/// Key holding stored manual-parsing examples.
pub const TRAINING_EXAMPLES_KEY: &str = "training.manual_parsing";

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn default_max_session_age() -> Duration {
    Duration::hours(24)
}

/// Why a persisted blob was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Malformed(String),
    Stale { age: Duration },
    NotResumable(SessionStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotVerdict {
    Restore(CookingSession),
    Discard(DiscardReason),
}

/// Serializes the live session for storage.
pub fn encode_session(session: &CookingSession) -> Result<String, serde_json::Error> {
    serde_json::to_string(session)
}

/// Judges a stored blob: restorable only if it parses, its status is active or
/// paused, and it was last touched less than `max_age` before `now`.
pub fn evaluate_snapshot(raw: &str, now: DateTime<Utc>, max_age: Duration) -> SnapshotVerdict {
    let session: CookingSession = match serde_json::from_str(raw) {
        Ok(session) => session,
        Err(e) => return SnapshotVerdict::Discard(DiscardReason::Malformed(e.to_string())),
    };
    let age = now - session.last_active_at;
    if age >= max_age {
        return SnapshotVerdict::Discard(DiscardReason::Stale { age });
    }
    if !session.status.is_resumable() {
        return SnapshotVerdict::Discard(DiscardReason::NotResumable(session.status));
    }
    SnapshotVerdict::Restore(session)
}

/// Puts `summary` at the front of `history`, keeping at most `limit` entries.
pub fn prepend_history(
    mut history: Vec<CompletionSummary>,
    summary: CompletionSummary,
    limit: usize,
) -> Vec<CompletionSummary> {
    history.retain(|h| h.session_id != summary.session_id);
    history.insert(0, summary);
    history.truncate(limit);
    history
}
