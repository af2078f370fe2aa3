//! crates/sous_core/src/session/state.rs
//!
//! The cooking session aggregate and the reducer state that holds it.

use super::timer::TimerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Inactive,
    Active,
    Paused,
    /// Only ever seen in persisted blobs and summaries; a finished session is not kept live.
    Completed,
}

impl SessionStatus {
    /// Whether a session in this status is one the user can go back to.
    pub fn is_resumable(self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "inactive"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepHistoryEntry {
    pub step_index: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookingSession {
    pub session_id: String,
    pub recipe_id: String,
    pub recipe_name: String,
    pub total_steps: usize,
    pub current_step_index: usize,
    #[serde(default)]
    pub completed_steps: BTreeSet<usize>,
    #[serde(default)]
    pub step_history: Vec<StepHistoryEntry>,
    pub status: SessionStatus,
    #[serde(default)]
    pub timer: TimerState,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl CookingSession {
    pub fn is_final_step(&self) -> bool {
        self.current_step_index + 1 == self.total_steps
    }

    /// Index bounds hold for the current step and every completed step, and
    /// the timer fits the accepted range.
    pub fn is_consistent(&self) -> bool {
        self.total_steps > 0
            && self.current_step_index < self.total_steps
            && self.completed_steps.iter().all(|&i| i < self.total_steps)
            && self.timer.is_within_bounds()
    }

    /// Fills `completed_at` on the most recent entry if it is still open.
    pub(crate) fn close_open_entry(&mut self, now: DateTime<Utc>) {
        if let Some(entry) = self.step_history.last_mut() {
            if entry.completed_at.is_none() {
                entry.completed_at = Some(now);
            }
        }
    }

    pub(crate) fn open_entry(&mut self, step_index: usize, now: DateTime<Utc>) {
        self.step_history.push(StepHistoryEntry {
            step_index,
            started_at: now,
            completed_at: None,
        });
    }

    /// Builds the history record written when the session ends.
    pub fn summarize(&self, now: DateTime<Utc>) -> CompletionSummary {
        CompletionSummary {
            session_id: self.session_id.clone(),
            recipe_id: self.recipe_id.clone(),
            recipe_name: self.recipe_name.clone(),
            completed_at: now,
            total_steps: self.total_steps,
            completed_count: self.completed_steps.len(),
            duration_secs: (now - self.started_at).num_seconds().max(0) as u64,
        }
    }
}

/// One finished session as kept in the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub session_id: String,
    pub recipe_id: String,
    pub recipe_name: String,
    pub completed_at: DateTime<Utc>,
    pub total_steps: usize,
    pub completed_count: usize,
    pub duration_secs: u64,
}

/// Reducer state. `None` is the inactive state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    session: Option<CookingSession>,
}

impl SessionState {
    pub fn inactive() -> Self {
        Self { session: None }
    }

    pub(crate) fn live(session: CookingSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&CookingSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Inactive, |s| s.status)
    }

    pub fn is_inactive(&self) -> bool {
        self.session.is_none()
    }
}
