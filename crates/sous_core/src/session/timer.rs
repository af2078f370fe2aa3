//! crates/sous_core/src/session/timer.rs
//!
//! The step timer. Remaining time is always derived from `expires_at - now`
//! while running, never decremented, so a suspended process catches up on
//! its next tick.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest countdown a step timer accepts.
pub const MAX_TIMER_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: TimerPhase,
    pub duration_secs: u64,
    /// Last computed remaining time; authoritative while paused.
    pub remaining_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    /// Only set while running.
    pub expires_at: Option<DateTime<Utc>>,
    pub step_id: Option<String>,
    pub label: Option<String>,
}

impl TimerState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// A fresh running timer. Whatever ran before is simply replaced.
    /// `None` when the duration is zero or longer than `MAX_TIMER_SECS`.
    pub fn start(
        duration_secs: u64,
        step_id: Option<String>,
        label: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if duration_secs == 0 || duration_secs > MAX_TIMER_SECS {
            return None;
        }
        Some(Self {
            phase: TimerPhase::Running,
            duration_secs,
            remaining_secs: duration_secs,
            started_at: Some(now),
            expires_at: Some(expiry(now, duration_secs)?),
            step_id,
            label,
        })
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    /// Whole seconds left at `now`, floored and never negative.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        match (self.phase, self.expires_at) {
            (TimerPhase::Running, Some(expires_at)) => {
                let millis = (expires_at - now).num_milliseconds();
                if millis <= 0 {
                    0
                } else {
                    (millis / 1000) as u64
                }
            }
            _ => self.remaining_secs,
        }
    }

    /// Recomputes the remaining time. Returns the new state and whether the
    /// timer expired on this tick. Anything but a running timer is unchanged.
    pub fn tick(&self, now: DateTime<Utc>) -> (Self, bool) {
        if !self.is_running() {
            return (self.clone(), false);
        }
        let remaining = self.remaining_at(now).min(self.remaining_secs);
        if remaining == 0 {
            let expired = Self {
                phase: TimerPhase::Expired,
                remaining_secs: 0,
                expires_at: None,
                ..self.clone()
            };
            return (expired, true);
        }
        (
            Self {
                remaining_secs: remaining,
                ..self.clone()
            },
            false,
        )
    }

    /// Freezes a running timer. `None` when it is not running.
    pub fn pause(&self, now: DateTime<Utc>) -> Option<Self> {
        if !self.is_running() {
            return None;
        }
        Some(Self {
            phase: TimerPhase::Paused,
            remaining_secs: self.remaining_at(now).min(self.remaining_secs),
            expires_at: None,
            ..self.clone()
        })
    }

    /// Restarts a paused timer from its frozen remaining time. `None` when it
    /// is not paused or the expiry cannot be represented.
    pub fn resume(&self, now: DateTime<Utc>) -> Option<Self> {
        if !self.is_paused() {
            return None;
        }
        Some(Self {
            phase: TimerPhase::Running,
            expires_at: Some(expiry(now, self.remaining_secs)?),
            ..self.clone()
        })
    }

    /// Remaining and total time both fit the accepted range.
    pub fn is_within_bounds(&self) -> bool {
        self.duration_secs <= MAX_TIMER_SECS && self.remaining_secs <= MAX_TIMER_SECS
    }

    /// The form a persisted timer takes when a session is restored: a running
    /// countdown becomes paused at its last recorded remaining time.
    pub fn for_restore(&self) -> Self {
        match self.phase {
            TimerPhase::Running => Self {
                phase: TimerPhase::Paused,
                expires_at: None,
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}

fn expiry(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let delta = Duration::try_seconds(i64::try_from(secs).ok()?)?;
    now.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_remaining_is_floored_from_expiry() {
        let timer = TimerState::start(180, None, None, t0()).unwrap();
        assert_eq!(timer.remaining_at(t0()), 180);
        assert_eq!(timer.remaining_at(t0() + Duration::milliseconds(1500)), 178);
        assert_eq!(timer.remaining_at(t0() + Duration::seconds(500)), 0);
    }

    #[test]
    fn test_tick_expires_exactly_once() {
        let timer = TimerState::start(2, None, Some("rest".to_string()), t0()).unwrap();
        let (timer, expired) = timer.tick(t0() + Duration::seconds(1));
        assert!(!expired);
        assert_eq!(timer.remaining_secs, 1);

        let (timer, expired) = timer.tick(t0() + Duration::seconds(2));
        assert!(expired);
        assert_eq!(timer.phase, TimerPhase::Expired);

        let (timer, expired) = timer.tick(t0() + Duration::seconds(3));
        assert!(!expired);
        assert_eq!(timer.phase, TimerPhase::Expired);
    }

    #[test]
    fn test_pause_excludes_paused_time() {
        let timer = TimerState::start(180, None, None, t0()).unwrap();
        let paused = timer.pause(t0() + Duration::seconds(5)).unwrap();
        assert_eq!(paused.remaining_secs, 175);
        assert!(paused.pause(t0()).is_none());

        let resumed = paused.resume(t0() + Duration::seconds(15)).unwrap();
        assert_eq!(resumed.remaining_at(t0() + Duration::seconds(15)), 175);
        assert!(resumed.resume(t0()).is_none());
    }

    #[test]
    fn test_restore_form_stops_countdown() {
        let mut timer = TimerState::start(60, None, None, t0()).unwrap();
        timer.remaining_secs = 42;
        let restored = timer.for_restore();
        assert_eq!(restored.phase, TimerPhase::Paused);
        assert_eq!(restored.remaining_secs, 42);
        assert_eq!(restored.expires_at, None);
    }

    #[test]
    fn test_start_rejects_out_of_range_durations() {
        assert!(TimerState::start(0, None, None, t0()).is_none());
        assert!(TimerState::start(MAX_TIMER_SECS + 1, None, None, t0()).is_none());
        assert!(TimerState::start(u64::MAX, None, None, t0()).is_none());
        let longest = TimerState::start(MAX_TIMER_SECS, None, None, t0()).unwrap();
        assert_eq!(longest.remaining_at(t0()), MAX_TIMER_SECS);
    }

    #[test]
    fn test_resume_with_unrepresentable_expiry_fails() {
        let timer = TimerState {
            phase: TimerPhase::Paused,
            duration_secs: u64::MAX,
            remaining_secs: u64::MAX,
            ..TimerState::default()
        };
        assert!(!timer.is_within_bounds());
        assert!(timer.resume(t0()).is_none());
    }
}
