//! crates/sous_core/src/session/reducer.rs
//!
//! The cooking session state machine as a pure function of (state, action).
//!
//! Every action carries the wall-clock time it happened at, so the reducer
//! never reads a clock and never touches storage. A rejected action leaves
//! the caller's state exactly as it was.

use super::state::{CookingSession, CompletionSummary, SessionState, SessionStatus};
use super::timer::{TimerState, MAX_TIMER_SECS};
use crate::domain::RecipeRef;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Everything that can happen to a cooking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start {
        session_id: String,
        recipe: RecipeRef,
        start_step_index: usize,
        now: DateTime<Utc>,
    },
    Pause {
        now: DateTime<Utc>,
    },
    Resume {
        now: DateTime<Utc>,
    },
    Advance {
        direction: Direction,
        explicit_index: Option<usize>,
        now: DateTime<Utc>,
    },
    End {
        save_to_history: bool,
        now: DateTime<Utc>,
    },
    Restore {
        session: CookingSession,
        now: DateTime<Utc>,
    },
    StartTimer {
        duration_secs: u64,
        step_id: Option<String>,
        label: Option<String>,
        now: DateTime<Utc>,
    },
    Tick {
        now: DateTime<Utc>,
    },
    PauseTimer {
        now: DateTime<Utc>,
    },
    ResumeTimer {
        now: DateTime<Utc>,
    },
    StopTimer {
        now: DateTime<Utc>,
    },
}

impl Action {
    /// Jump to a zero-based step; moving forward completes the current step.
    pub fn go_to_step(current_index: usize, index: usize, now: DateTime<Utc>) -> Self {
        let direction = if index > current_index {
            Direction::Next
        } else {
            Direction::Previous
        };
        Action::Advance {
            direction,
            explicit_index: Some(index),
            now,
        }
    }

    /// Short name used in logs and rejection notices.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start { .. } => "start",
            Action::Pause { .. } => "pause",
            Action::Resume { .. } => "resume",
            Action::Advance {
                direction: Direction::Next,
                ..
            } => "next_step",
            Action::Advance {
                direction: Direction::Previous,
                ..
            } => "previous_step",
            Action::End { .. } => "end",
            Action::Restore { .. } => "restore",
            Action::StartTimer { .. } => "start_timer",
            Action::Tick { .. } => "tick",
            Action::PauseTimer { .. } => "pause_timer",
            Action::ResumeTimer { .. } => "resume_timer",
            Action::StopTimer { .. } => "stop_timer",
        }
    }
}

/// Notable side results of a transition, for the effect handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ended {
        summary: CompletionSummary,
        save_to_history: bool,
    },
    TimerExpired {
        step_id: Option<String>,
        label: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub event: Option<SessionEvent>,
}

impl Transition {
    fn to(state: SessionState) -> Self {
        Self { state, event: None }
    }

    fn live(session: CookingSession) -> Self {
        Self::to(SessionState::live(session))
    }
}

/// A precondition the action did not meet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no active session")]
    NoActiveSession,
    #[error("a session for '{recipe_name}' is already in progress")]
    SessionAlreadyActive { recipe_name: String },
    #[error("session is paused")]
    SessionPaused,
    #[error("session is not paused")]
    SessionNotPaused,
    #[error("recipe has no steps")]
    EmptyRecipe,
    #[error("invalid step index {index} for a recipe with {total_steps} steps")]
    InvalidStepIndex { index: usize, total_steps: usize },
    #[error("already at the first step")]
    AlreadyAtFirstStep,
    #[error("timer duration must be between 1 and {max} seconds")]
    InvalidTimerDuration { max: u64 },
    #[error("no running timer")]
    NoRunningTimer,
    #[error("no paused timer")]
    NoPausedTimer,
    #[error("persisted session cannot be restored: {0}")]
    Unrestorable(String),
}

/// Applies `action` to `state`.
pub fn reduce(state: &SessionState, action: Action) -> Result<Transition, Rejection> {
    match action {
        Action::Start {
            session_id,
            recipe,
            start_step_index,
            now,
        } => start(state, session_id, recipe, start_step_index, now),
        Action::Restore { session, now } => restore(state, session, now),
        Action::Tick { now } => Ok(tick(state, now)),
        Action::Pause { now } => {
            let session = live(state)?;
            require_active(session)?;
            let mut next = session.clone();
            next.status = SessionStatus::Paused;
            if let Some(timer) = next.timer.pause(now) {
                next.timer = timer;
            }
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
        Action::Resume { now } => {
            let session = live(state)?;
            if session.status != SessionStatus::Paused {
                return Err(Rejection::SessionNotPaused);
            }
            let mut next = session.clone();
            next.status = SessionStatus::Active;
            if let Some(timer) = next.timer.resume(now) {
                next.timer = timer;
            }
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
        Action::Advance {
            direction,
            explicit_index,
            now,
        } => advance(live(state)?, direction, explicit_index, now),
        Action::End {
            save_to_history,
            now,
        } => Ok(end(live(state)?, save_to_history, now)),
        Action::StartTimer {
            duration_secs,
            step_id,
            label,
            now,
        } => {
            let session = live(state)?;
            require_active(session)?;
            let timer = TimerState::start(duration_secs, step_id, label, now).ok_or(
                Rejection::InvalidTimerDuration {
                    max: MAX_TIMER_SECS,
                },
            )?;
            let mut next = session.clone();
            next.timer = timer;
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
        Action::PauseTimer { now } => {
            let session = live(state)?;
            let mut next = session.clone();
            next.timer = session.timer.pause(now).ok_or(Rejection::NoRunningTimer)?;
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
        Action::ResumeTimer { now } => {
            let session = live(state)?;
            require_active(session)?;
            let mut next = session.clone();
            next.timer = session.timer.resume(now).ok_or(Rejection::NoPausedTimer)?;
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
        Action::StopTimer { now } => {
            let mut next = live(state)?.clone();
            next.timer = TimerState::idle();
            next.last_active_at = now;
            Ok(Transition::live(next))
        }
    }
}

fn live(state: &SessionState) -> Result<&CookingSession, Rejection> {
    state.session().ok_or(Rejection::NoActiveSession)
}

fn require_active(session: &CookingSession) -> Result<(), Rejection> {
    match session.status {
        SessionStatus::Active => Ok(()),
        SessionStatus::Paused => Err(Rejection::SessionPaused),
        SessionStatus::Inactive | SessionStatus::Completed => Err(Rejection::NoActiveSession),
    }
}

fn start(
    state: &SessionState,
    session_id: String,
    recipe: RecipeRef,
    start_step_index: usize,
    now: DateTime<Utc>,
) -> Result<Transition, Rejection> {
    if let Some(existing) = state.session() {
        return Err(Rejection::SessionAlreadyActive {
            recipe_name: existing.recipe_name.clone(),
        });
    }
    if recipe.step_count == 0 {
        return Err(Rejection::EmptyRecipe);
    }
    if start_step_index >= recipe.step_count {
        return Err(Rejection::InvalidStepIndex {
            index: start_step_index,
            total_steps: recipe.step_count,
        });
    }

    let mut session = CookingSession {
        session_id,
        recipe_id: recipe.id,
        recipe_name: recipe.title,
        total_steps: recipe.step_count,
        current_step_index: start_step_index,
        completed_steps: Default::default(),
        step_history: Vec::new(),
        status: SessionStatus::Active,
        timer: TimerState::idle(),
        started_at: now,
        last_active_at: now,
    };
    session.open_entry(start_step_index, now);
    Ok(Transition::live(session))
}

fn advance(
    session: &CookingSession,
    direction: Direction,
    explicit_index: Option<usize>,
    now: DateTime<Utc>,
) -> Result<Transition, Rejection> {
    require_active(session)?;
    let current = session.current_step_index;

    let target = match (explicit_index, direction) {
        (Some(index), _) if index >= session.total_steps => {
            return Err(Rejection::InvalidStepIndex {
                index,
                total_steps: session.total_steps,
            })
        }
        (Some(index), _) => index,
        (None, Direction::Next) if session.is_final_step() => {
            let mut finished = session.clone();
            finished.completed_steps.insert(current);
            finished.close_open_entry(now);
            return Ok(end(&finished, true, now));
        }
        (None, Direction::Next) => current + 1,
        (None, Direction::Previous) if current == 0 => {
            return Err(Rejection::AlreadyAtFirstStep)
        }
        (None, Direction::Previous) => current - 1,
    };

    let mut next = session.clone();
    next.last_active_at = now;
    if direction == Direction::Next {
        next.completed_steps.insert(current);
    }
    if target != current {
        next.close_open_entry(now);
        next.open_entry(target, now);
        next.current_step_index = target;
        next.timer = TimerState::idle();
    }
    Ok(Transition::live(next))
}

fn end(session: &CookingSession, save_to_history: bool, now: DateTime<Utc>) -> Transition {
    Transition {
        state: SessionState::inactive(),
        event: Some(SessionEvent::Ended {
            summary: session.summarize(now),
            save_to_history,
        }),
    }
}

fn restore(
    state: &SessionState,
    persisted: CookingSession,
    now: DateTime<Utc>,
) -> Result<Transition, Rejection> {
    if let Some(existing) = state.session() {
        return Err(Rejection::SessionAlreadyActive {
            recipe_name: existing.recipe_name.clone(),
        });
    }
    if !persisted.status.is_resumable() {
        return Err(Rejection::Unrestorable(format!(
            "status is {}",
            persisted.status
        )));
    }
    if !persisted.is_consistent() {
        return Err(Rejection::Unrestorable(
            "step indices or timer are out of bounds".to_string(),
        ));
    }

    let mut session = persisted;
    session.timer = session.timer.for_restore();
    session.last_active_at = now;
    Ok(Transition::live(session))
}

fn tick(state: &SessionState, now: DateTime<Utc>) -> Transition {
    let Some(session) = state.session() else {
        return Transition::to(state.clone());
    };
    let (timer, expired) = session.timer.tick(now);
    if timer == session.timer {
        return Transition::to(state.clone());
    }
    let event = expired.then(|| SessionEvent::TimerExpired {
        step_id: timer.step_id.clone(),
        label: timer.label.clone(),
    });
    let mut next = session.clone();
    next.timer = timer;
    Transition {
        state: SessionState::live(next),
        event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::timer::TimerPhase;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn pasta() -> RecipeRef {
        RecipeRef {
            id: "r-pasta".to_string(),
            title: "Pasta".to_string(),
            step_count: 6,
        }
    }

    fn started() -> SessionState {
        reduce(
            &SessionState::inactive(),
            Action::Start {
                session_id: "s-1".to_string(),
                recipe: pasta(),
                start_step_index: 0,
                now: t(0),
            },
        )
        .unwrap()
        .state
    }

    fn apply(state: &SessionState, action: Action) -> SessionState {
        reduce(state, action).unwrap().state
    }

    fn next(secs: i64) -> Action {
        Action::Advance {
            direction: Direction::Next,
            explicit_index: None,
            now: t(secs),
        }
    }

    #[test]
    fn test_start_opens_history() {
        let state = started();
        let session = state.session().unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_step_index, 0);
        assert_eq!(session.step_history.len(), 1);
        assert_eq!(session.step_history[0].completed_at, None);
    }

    #[test]
    fn test_start_is_rejected_while_live() {
        let state = started();
        let err = reduce(
            &state,
            Action::Start {
                session_id: "s-2".to_string(),
                recipe: RecipeRef {
                    id: "r-soup".to_string(),
                    title: "Soup".to_string(),
                    step_count: 3,
                },
                start_step_index: 0,
                now: t(5),
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            Rejection::SessionAlreadyActive {
                recipe_name: "Pasta".to_string()
            }
        );

        let paused = apply(&state, Action::Pause { now: t(1) });
        assert!(reduce(
            &paused,
            Action::Start {
                session_id: "s-3".to_string(),
                recipe: pasta(),
                start_step_index: 0,
                now: t(2),
            }
        )
        .is_err());
    }

    #[test]
    fn test_start_validates_recipe() {
        let empty = RecipeRef {
            step_count: 0,
            ..pasta()
        };
        let err = reduce(
            &SessionState::inactive(),
            Action::Start {
                session_id: "s".to_string(),
                recipe: empty,
                start_step_index: 0,
                now: t(0),
            },
        )
        .unwrap_err();
        assert_eq!(err, Rejection::EmptyRecipe);

        let err = reduce(
            &SessionState::inactive(),
            Action::Start {
                session_id: "s".to_string(),
                recipe: pasta(),
                start_step_index: 6,
                now: t(0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidStepIndex { index: 6, .. }));
    }

    #[test]
    fn test_next_completes_step_and_resets_timer() {
        let state = started();
        let state = apply(
            &state,
            Action::StartTimer {
                duration_secs: 60,
                step_id: None,
                label: None,
                now: t(1),
            },
        );
        let state = apply(&state, next(10));
        let session = state.session().unwrap();
        assert_eq!(session.current_step_index, 1);
        assert!(session.completed_steps.contains(&0));
        assert_eq!(session.step_history.len(), 2);
        assert_eq!(session.step_history[0].completed_at, Some(t(10)));
        assert_eq!(session.timer.phase, TimerPhase::Idle);
    }

    #[test]
    fn test_next_on_final_step_ends_session() {
        let mut state = started();
        for i in 0..5 {
            state = apply(&state, next(i + 1));
        }
        assert!(state.session().unwrap().is_final_step());

        let transition = reduce(&state, next(60)).unwrap();
        assert!(transition.state.is_inactive());
        match transition.event {
            Some(SessionEvent::Ended {
                summary,
                save_to_history,
            }) => {
                assert!(save_to_history);
                assert_eq!(summary.completed_count, 6);
                assert_eq!(summary.total_steps, 6);
                assert_eq!(summary.duration_secs, 60);
            }
            other => panic!("expected Ended, got {:?}", other),
        }
    }

    #[test]
    fn test_previous_at_first_step_is_rejected() {
        let state = started();
        let err = reduce(
            &state,
            Action::Advance {
                direction: Direction::Previous,
                explicit_index: None,
                now: t(1),
            },
        )
        .unwrap_err();
        assert_eq!(err, Rejection::AlreadyAtFirstStep);
    }

    #[test]
    fn test_previous_does_not_complete() {
        let state = apply(&started(), next(1));
        let state = apply(
            &state,
            Action::Advance {
                direction: Direction::Previous,
                explicit_index: None,
                now: t(2),
            },
        );
        let session = state.session().unwrap();
        assert_eq!(session.current_step_index, 0);
        assert_eq!(session.completed_steps.len(), 1);
        assert_eq!(session.step_history.len(), 3);
    }

    #[test]
    fn test_go_to_step_bounds() {
        let state = started();
        let err = reduce(&state, Action::go_to_step(0, 6, t(1))).unwrap_err();
        assert_eq!(
            err,
            Rejection::InvalidStepIndex {
                index: 6,
                total_steps: 6
            }
        );

        let state = apply(&state, Action::go_to_step(0, 4, t(1)));
        let session = state.session().unwrap();
        assert_eq!(session.current_step_index, 4);
        assert!(session.completed_steps.contains(&0));

        let same = apply(&state, Action::go_to_step(4, 4, t(2)));
        assert_eq!(same.session().unwrap().step_history.len(), 2);
    }

    #[test]
    fn test_advance_requires_active() {
        let paused = apply(&started(), Action::Pause { now: t(1) });
        assert_eq!(reduce(&paused, next(2)).unwrap_err(), Rejection::SessionPaused);
        assert_eq!(
            reduce(&SessionState::inactive(), next(2)).unwrap_err(),
            Rejection::NoActiveSession
        );
    }

    #[test]
    fn test_pause_and_resume_carry_the_timer() {
        let state = apply(
            &started(),
            Action::StartTimer {
                duration_secs: 180,
                step_id: Some("step-1".to_string()),
                label: Some("Boil".to_string()),
                now: t(0),
            },
        );
        let paused = apply(&state, Action::Pause { now: t(20) });
        let timer = &paused.session().unwrap().timer;
        assert_eq!(timer.phase, TimerPhase::Paused);
        assert_eq!(timer.remaining_secs, 160);

        let resumed = apply(&paused, Action::Resume { now: t(80) });
        let timer = &resumed.session().unwrap().timer;
        assert_eq!(timer.phase, TimerPhase::Running);
        assert_eq!(timer.expires_at, Some(t(240)));
    }

    #[test]
    fn test_timer_guards() {
        let state = started();
        assert_eq!(
            reduce(&state, Action::PauseTimer { now: t(1) }).unwrap_err(),
            Rejection::NoRunningTimer
        );
        assert_eq!(
            reduce(&state, Action::ResumeTimer { now: t(1) }).unwrap_err(),
            Rejection::NoPausedTimer
        );
        assert_eq!(
            reduce(
                &state,
                Action::StartTimer {
                    duration_secs: 0,
                    step_id: None,
                    label: None,
                    now: t(1)
                }
            )
            .unwrap_err(),
            Rejection::InvalidTimerDuration {
                max: MAX_TIMER_SECS
            }
        );
    }

    #[test]
    fn test_oversized_timer_is_rejected_without_change() {
        let state = started();
        for duration_secs in [MAX_TIMER_SECS + 1, 10_000_000_000_000, u64::MAX] {
            let err = reduce(
                &state,
                Action::StartTimer {
                    duration_secs,
                    step_id: None,
                    label: None,
                    now: t(1),
                },
            )
            .unwrap_err();
            assert!(matches!(err, Rejection::InvalidTimerDuration { .. }));
        }
        assert_eq!(state.session().unwrap().timer.phase, TimerPhase::Idle);
    }

    #[test]
    fn test_starting_a_timer_replaces_the_old_one() {
        let state = apply(
            &started(),
            Action::StartTimer {
                duration_secs: 300,
                step_id: None,
                label: Some("first".to_string()),
                now: t(0),
            },
        );
        let state = apply(&state, Action::PauseTimer { now: t(100) });
        let state = apply(
            &state,
            Action::StartTimer {
                duration_secs: 60,
                step_id: None,
                label: Some("second".to_string()),
                now: t(101),
            },
        );
        let timer = &state.session().unwrap().timer;
        assert_eq!(timer.remaining_secs, 60);
        assert_eq!(timer.label.as_deref(), Some("second"));
        assert!(timer.is_running());
    }

    #[test]
    fn test_tick_emits_expiry_once() {
        let state = apply(
            &started(),
            Action::StartTimer {
                duration_secs: 3,
                step_id: None,
                label: Some("eggs".to_string()),
                now: t(0),
            },
        );
        let expired = reduce(&state, Action::Tick { now: t(3) }).unwrap();
        assert_eq!(
            expired.event,
            Some(SessionEvent::TimerExpired {
                step_id: None,
                label: Some("eggs".to_string())
            })
        );
        let again = reduce(&expired.state, Action::Tick { now: t(4) }).unwrap();
        assert_eq!(again.event, None);
        assert_eq!(again.state, expired.state);
    }

    #[test]
    fn test_end_without_history() {
        let transition = reduce(
            &started(),
            Action::End {
                save_to_history: false,
                now: t(30),
            },
        )
        .unwrap();
        assert!(transition.state.is_inactive());
        assert!(matches!(
            transition.event,
            Some(SessionEvent::Ended {
                save_to_history: false,
                ..
            })
        ));
        assert_eq!(
            reduce(
                &SessionState::inactive(),
                Action::End {
                    save_to_history: true,
                    now: t(30)
                }
            )
            .unwrap_err(),
            Rejection::NoActiveSession
        );
    }

    #[test]
    fn test_restore_rules() {
        let state = apply(
            &started(),
            Action::StartTimer {
                duration_secs: 90,
                step_id: None,
                label: None,
                now: t(0),
            },
        );
        let state = apply(&state, Action::Tick { now: t(30) });
        let persisted = state.session().unwrap().clone();

        let restored = apply(
            &SessionState::inactive(),
            Action::Restore {
                session: persisted.clone(),
                now: t(600),
            },
        );
        let timer = &restored.session().unwrap().timer;
        assert_eq!(timer.phase, TimerPhase::Paused);
        assert_eq!(timer.remaining_secs, 60);
        assert_eq!(restored.session().unwrap().last_active_at, t(600));

        assert!(matches!(
            reduce(
                &restored,
                Action::Restore {
                    session: persisted.clone(),
                    now: t(601)
                }
            ),
            Err(Rejection::SessionAlreadyActive { .. })
        ));

        let completed = CookingSession {
            status: SessionStatus::Completed,
            ..persisted.clone()
        };
        assert!(matches!(
            reduce(
                &SessionState::inactive(),
                Action::Restore {
                    session: completed,
                    now: t(601)
                }
            ),
            Err(Rejection::Unrestorable(_))
        ));

        let corrupt = CookingSession {
            current_step_index: 9,
            ..persisted
        };
        assert!(matches!(
            reduce(
                &SessionState::inactive(),
                Action::Restore {
                    session: corrupt,
                    now: t(601)
                }
            ),
            Err(Rejection::Unrestorable(_))
        ));
    }
}
