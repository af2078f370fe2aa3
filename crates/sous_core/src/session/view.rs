//! crates/sous_core/src/session/view.rs
//!
//! Display-ready values derived from the raw session state.

use super::state::{SessionState, SessionStatus};
use super::timer::{TimerPhase, TimerState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub is_active: bool,
    pub is_paused: bool,
    pub is_expired: bool,
    pub remaining_time: u64,
    pub formatted_text: String,
    pub label: Option<String>,
    pub step_id: Option<String>,
}

impl From<&TimerState> for TimerView {
    fn from(timer: &TimerState) -> Self {
        Self {
            is_active: timer.phase == TimerPhase::Running,
            is_paused: timer.phase == TimerPhase::Paused,
            is_expired: timer.phase == TimerPhase::Expired,
            remaining_time: timer.remaining_secs,
            formatted_text: format_timer(timer.remaining_secs),
            label: timer.label.clone(),
            step_id: timer.step_id.clone(),
        }
    }
}

/// What the UI renders for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub is_active: bool,
    pub status: SessionStatus,
    pub recipe_name: Option<String>,
    /// One-based; zero when there is no session.
    pub current_step: usize,
    pub total_steps: usize,
    pub completed_count: usize,
    pub progress: u8,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub is_final_step: bool,
    pub timer: TimerView,
}

impl SessionView {
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            status: SessionStatus::Inactive,
            recipe_name: None,
            current_step: 0,
            total_steps: 0,
            completed_count: 0,
            progress: 0,
            can_go_next: false,
            can_go_previous: false,
            is_final_step: false,
            timer: TimerView {
                formatted_text: format_timer(0),
                ..TimerView::default()
            },
        }
    }
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        let Some(session) = state.session() else {
            return SessionView::inactive();
        };
        let current_step = session.current_step_index + 1;
        Self {
            is_active: true,
            status: session.status,
            recipe_name: Some(session.recipe_name.clone()),
            current_step,
            total_steps: session.total_steps,
            completed_count: session.completed_steps.len(),
            progress: progress_percent(current_step, session.total_steps),
            can_go_next: session.current_step_index + 1 < session.total_steps,
            can_go_previous: session.current_step_index > 0,
            is_final_step: session.is_final_step(),
            timer: TimerView::from(&session.timer),
        }
    }
}

/// `round(current / total * 100)`, zero for an empty recipe.
pub fn progress_percent(current_step: usize, total_steps: usize) -> u8 {
    if total_steps == 0 {
        return 0;
    }
    let percent = (current_step as f64 / total_steps as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// `H:MM:SS` from one hour up, `M:SS` below.
pub fn format_timer(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
