//! services/kitchen/src/session/service.rs
//!
//! The cooking session facade. It serializes every command through the pure
//! reducer, then runs the effects of each accepted transition: persistence,
//! history, the timer tick task, and change notification.

use super::persistence::{spawn_worker, PersistenceHandle};
use crate::config::Config;
use chrono::{DateTime, Utc};
use sous_core::domain::RecipeRef;
use sous_core::ports::{Clock, KeyValueStore, PortResult};
use sous_core::session::snapshot::{
    default_max_session_age, encode_session, evaluate_snapshot, ACTIVE_SESSION_KEY,
    DEFAULT_HISTORY_LIMIT, SESSION_HISTORY_KEY,
};
use sous_core::session::{
    reduce, Action, CompletionSummary, CookingSession, Direction, Rejection, SessionEvent,
    SessionState, SessionView, SnapshotVerdict, TimerPhase, Transition,
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

//=========================================================================================
// Settings and Options
//=========================================================================================

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Persisted sessions older than this are discarded on startup.
    pub max_session_age: chrono::Duration,
    pub history_limit: usize,
    pub tick_interval: Duration,
    pub persist_debounce: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_session_age: default_max_session_age(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            tick_interval: Duration::from_secs(1),
            persist_debounce: Duration::from_millis(250),
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_session_age: config.max_session_age,
            history_limit: config.history_limit,
            tick_interval: config.tick_interval,
            persist_debounce: config.persist_debounce,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Zero-based step to begin on.
    pub start_step_index: usize,
    /// Generated when absent.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TimerOptions {
    pub step_id: Option<String>,
    pub label: Option<String>,
}

/// Things worth telling every listener about, beyond the view itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    TimerExpired {
        step_id: Option<String>,
        label: Option<String>,
    },
    SessionEnded {
        summary: CompletionSummary,
    },
}

//=========================================================================================
// The Facade
//=========================================================================================

/// Handle to the one cooking session of this process. Clones share the session.
#[derive(Clone)]
pub struct CookingSessionService {
    inner: Arc<Inner>,
}

struct Inner {
    core: Mutex<Core>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    persistence: PersistenceHandle,
    views: watch::Sender<SessionView>,
    notices: broadcast::Sender<SessionNotice>,
    /// Parent of the tick token; also stops the persistence worker.
    shutdown: CancellationToken,
}

struct Core {
    state: SessionState,
    tick: Option<CancellationToken>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl CookingSessionService {
    /// Builds the service and restores any resumable persisted session before
    /// returning, so no command can race the restore.
    pub async fn start(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (persistence, _worker) = spawn_worker(
            store.clone(),
            settings.history_limit,
            settings.persist_debounce,
            shutdown.clone(),
        );
        let (views, _) = watch::channel(SessionView::inactive());
        let (notices, _) = broadcast::channel(32);

        let service = Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state: SessionState::inactive(),
                    tick: None,
                }),
                store,
                clock,
                settings,
                persistence,
                views,
                notices,
                shutdown,
            }),
        };
        service.restore().await;
        service
    }

    async fn restore(&self) {
        let raw = match self.inner.store.get(ACTIVE_SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not read the persisted session: {}", e);
                return;
            }
        };

        let now = self.inner.clock.now();
        match evaluate_snapshot(&raw, now, self.inner.settings.max_session_age) {
            SnapshotVerdict::Restore(session) => {
                let session_id = session.session_id.clone();
                if self
                    .dispatch(move |_, now| Ok(Action::Restore { session, now }))
                    .await
                {
                    info!("Restored cooking session {}.", session_id);
                    return;
                }
            }
            SnapshotVerdict::Discard(reason) => {
                debug!("Discarding persisted session: {:?}", reason);
            }
        }
        if let Err(e) = self.inner.store.remove(ACTIVE_SESSION_KEY).await {
            warn!("Failed to remove the discarded session: {}", e);
        }
    }

    //-------------------------------------------------------------------------------------
    // Commands
    //-------------------------------------------------------------------------------------

    pub async fn start_session(&self, recipe: RecipeRef, options: StartOptions) -> bool {
        let session_id = options
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.dispatch(move |_, now| {
            Ok(Action::Start {
                session_id,
                recipe,
                start_step_index: options.start_step_index,
                now,
            })
        })
        .await
    }

    /// Ends the session and waits until the cleared state has been written.
    pub async fn end_session(&self, save_to_history: bool) -> bool {
        let ended = self
            .dispatch(|_, now| {
                Ok(Action::End {
                    save_to_history,
                    now,
                })
            })
            .await;
        self.flush().await;
        ended
    }

    /// Jumps to a one-based step number.
    pub async fn go_to_step(&self, step: usize) -> bool {
        self.dispatch(|state, now| {
            let session = state.session().ok_or(Rejection::NoActiveSession)?;
            let index = step.checked_sub(1).ok_or(Rejection::InvalidStepIndex {
                index: step,
                total_steps: session.total_steps,
            })?;
            Ok(Action::go_to_step(session.current_step_index, index, now))
        })
        .await
    }

    /// Completes the current step; on the final step this finishes the session.
    pub async fn next_step(&self) -> bool {
        self.advance(Direction::Next).await
    }

    pub async fn previous_step(&self) -> bool {
        self.advance(Direction::Previous).await
    }

    async fn advance(&self, direction: Direction) -> bool {
        self.dispatch(|_, now| {
            Ok(Action::Advance {
                direction,
                explicit_index: None,
                now,
            })
        })
        .await
    }

    pub async fn pause_session(&self) -> bool {
        self.dispatch(|_, now| Ok(Action::Pause { now })).await
    }

    pub async fn resume_session(&self) -> bool {
        self.dispatch(|_, now| Ok(Action::Resume { now })).await
    }

    pub async fn start_timer(&self, duration_secs: u64, options: TimerOptions) -> bool {
        self.dispatch(move |_, now| {
            Ok(Action::StartTimer {
                duration_secs,
                step_id: options.step_id,
                label: options.label,
                now,
            })
        })
        .await
    }

    pub async fn pause_timer(&self) -> bool {
        self.dispatch(|_, now| Ok(Action::PauseTimer { now })).await
    }

    pub async fn resume_timer(&self) -> bool {
        self.dispatch(|_, now| Ok(Action::ResumeTimer { now })).await
    }

    pub async fn stop_timer(&self) -> bool {
        self.dispatch(|_, now| Ok(Action::StopTimer { now })).await
    }

    /// Pauses a running timer or resumes a paused one.
    pub async fn toggle_timer(&self) -> bool {
        self.dispatch(|state, now| {
            let session = state.session().ok_or(Rejection::NoActiveSession)?;
            match session.timer.phase {
                TimerPhase::Running => Ok(Action::PauseTimer { now }),
                TimerPhase::Paused => Ok(Action::ResumeTimer { now }),
                TimerPhase::Idle | TimerPhase::Expired => Err(Rejection::NoRunningTimer),
            }
        })
        .await
    }

    /// Recomputes the running timer against the clock. Driven by the tick task.
    pub async fn tick(&self) {
        self.dispatch(|_, now| Ok(Action::Tick { now })).await;
    }

    //-------------------------------------------------------------------------------------
    // Read Side
    //-------------------------------------------------------------------------------------

    pub fn view(&self) -> SessionView {
        self.inner.views.borrow().clone()
    }

    /// A receiver that always holds the latest view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.views.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    pub async fn session(&self) -> Option<CookingSession> {
        self.inner.core.lock().await.state.session().cloned()
    }

    /// Finished sessions, newest first.
    pub async fn history(&self) -> PortResult<Vec<CompletionSummary>> {
        self.flush().await;
        match self.inner.store.get(SESSION_HISTORY_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Waits for all queued persistence work.
    pub async fn flush(&self) {
        self.inner.persistence.flush().await;
    }

    /// Stops the tick task and the persistence worker after a final flush.
    pub async fn shutdown(&self) {
        {
            let mut core = self.inner.core.lock().await;
            if let Some(token) = core.tick.take() {
                token.cancel();
            }
        }
        self.flush().await;
        self.inner.shutdown.cancel();
        info!("Cooking session service shut down.");
    }

    //-------------------------------------------------------------------------------------
    // Dispatch and Effects
    //-------------------------------------------------------------------------------------

    /// Builds an action from the current state under the lock, reduces it, and
    /// applies the effects. Returns whether the action was accepted.
    async fn dispatch<F>(&self, make: F) -> bool
    where
        F: FnOnce(&SessionState, DateTime<Utc>) -> Result<Action, Rejection>,
    {
        let mut core = self.inner.core.lock().await;
        let now = self.inner.clock.now();
        let action = match make(&core.state, now) {
            Ok(action) => action,
            Err(rejection) => {
                warn!("Command rejected: {}", rejection);
                return false;
            }
        };
        let name = action.name();
        match reduce(&core.state, action) {
            Ok(transition) => {
                self.apply(&mut core, transition);
                true
            }
            Err(rejection) => {
                warn!("Command '{}' rejected: {}", name, rejection);
                false
            }
        }
    }

    fn apply(&self, core: &mut Core, transition: Transition) {
        let Transition { state, event } = transition;
        if state == core.state && event.is_none() {
            return;
        }

        self.reschedule_tick(core, &state);

        match state.session() {
            Some(session) => match encode_session(session) {
                Ok(json) => self.inner.persistence.save(json),
                Err(e) => warn!("Failed to serialize the session snapshot: {}", e),
            },
            None if !core.state.is_inactive() => self.inner.persistence.clear(),
            None => {}
        }

        match event {
            Some(SessionEvent::Ended {
                summary,
                save_to_history,
            }) => {
                info!(
                    "Session {} for '{}' ended with {} of {} steps completed.",
                    summary.session_id,
                    summary.recipe_name,
                    summary.completed_count,
                    summary.total_steps
                );
                if save_to_history {
                    self.inner.persistence.record(summary.clone());
                }
                let _ = self.inner.notices.send(SessionNotice::SessionEnded { summary });
            }
            Some(SessionEvent::TimerExpired { step_id, label }) => {
                info!("Timer expired ({}).", label.as_deref().unwrap_or("unlabeled"));
                let _ = self
                    .inner
                    .notices
                    .send(SessionNotice::TimerExpired { step_id, label });
            }
            None => {}
        }

        core.state = state;
        self.inner.views.send_replace(SessionView::from(&core.state));
    }

    /// Keeps exactly one tick task alive while the timer runs, restarting it
    /// whenever the expiry moves.
    fn reschedule_tick(&self, core: &mut Core, next: &SessionState) {
        let previous = core.state.session().map(|s| &s.timer);
        let running = next.session().map(|s| &s.timer).filter(|t| t.is_running());

        let Some(timer) = running else {
            if let Some(token) = core.tick.take() {
                token.cancel();
            }
            return;
        };

        let same_countdown = previous
            .is_some_and(|p| p.is_running() && p.expires_at == timer.expires_at)
            && core.tick.is_some();
        if same_countdown {
            return;
        }
        if let Some(token) = core.tick.take() {
            token.cancel();
        }
        let token = self.inner.shutdown.child_token();
        spawn_ticker(
            Arc::downgrade(&self.inner),
            self.inner.settings.tick_interval,
            token.clone(),
        );
        core.tick = Some(token);
    }
}

/// The recurring tick. Holds only a weak reference so it never keeps a
/// dropped service alive.
fn spawn_ticker(service: Weak<Inner>, period: Duration, token: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let Some(inner) = service.upgrade() else { break };
                    CookingSessionService { inner }.tick().await;
                }
            }
        }
        debug!("Timer tick task stopped.");
    });
}
