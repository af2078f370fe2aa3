//! End-to-end behavior of the cooking session service over real adapters.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use kitchen_lib::adapters::{FileStore, ManualClock, MemoryStore};
use kitchen_lib::session::{
    CookingSessionService, SessionNotice, SessionSettings, StartOptions, TimerOptions,
};
use kitchen_lib::training::TrainingStore;
use sous_core::domain::{DataCollectionPreferences, RecipeRef};
use sous_core::ports::{Clock, KeyValueStore, PortError, PortResult};
use sous_core::session::snapshot::{encode_session, ACTIVE_SESSION_KEY};
use sous_core::session::{SessionStatus, TimerPhase};
use std::sync::Arc;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap()
}

fn pasta() -> RecipeRef {
    RecipeRef {
        id: "r-pasta".to_string(),
        title: "Pasta".to_string(),
        step_count: 6,
    }
}

/// A store whose every operation fails, like a full or read-only disk.
struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> PortResult<Option<String>> {
        Err(PortError::Unexpected("storage unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> PortResult<()> {
        Err(PortError::Unexpected("storage unavailable".to_string()))
    }

    async fn remove(&self, _key: &str) -> PortResult<()> {
        Err(PortError::Unexpected("storage unavailable".to_string()))
    }
}

async fn service_with(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<ManualClock>,
    settings: SessionSettings,
) -> CookingSessionService {
    CookingSessionService::start(store, clock, settings).await
}

async fn fresh() -> (CookingSessionService, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let service = service_with(store.clone(), clock.clone(), SessionSettings::default()).await;
    (service, store, clock)
}

#[tokio::test]
async fn test_start_shows_first_step() {
    let (service, _store, _clock) = fresh().await;
    assert!(service.start_session(pasta(), StartOptions::default()).await);

    let view = service.view();
    assert!(view.is_active);
    assert_eq!(view.status, SessionStatus::Active);
    assert_eq!(view.recipe_name.as_deref(), Some("Pasta"));
    assert_eq!(view.current_step, 1);
    assert_eq!(view.total_steps, 6);
    assert_eq!(view.progress, 17);
    assert!(view.can_go_next);
    assert!(!view.can_go_previous);
}

#[tokio::test]
async fn test_second_start_is_refused() {
    let (service, _store, _clock) = fresh().await;
    assert!(service.start_session(pasta(), StartOptions::default()).await);
    let first_id = service.session().await.unwrap().session_id;

    let soup = RecipeRef {
        id: "r-soup".to_string(),
        title: "Soup".to_string(),
        step_count: 3,
    };
    assert!(!service.start_session(soup, StartOptions::default()).await);

    let session = service.session().await.unwrap();
    assert_eq!(session.session_id, first_id);
    assert_eq!(session.recipe_name, "Pasta");
}

#[tokio::test]
async fn test_finishing_the_last_step_records_history() {
    let (service, store, clock) = fresh().await;
    let mut notices = service.events();
    service.start_session(pasta(), StartOptions::default()).await;

    for _ in 0..5 {
        clock.advance(Duration::minutes(2));
        assert!(service.next_step().await);
    }
    assert!(service.view().is_final_step);

    clock.advance(Duration::minutes(2));
    assert!(service.next_step().await);
    service.flush().await;

    assert!(!service.view().is_active);
    assert_eq!(store.get(ACTIVE_SESSION_KEY).await.unwrap(), None);

    let history = service.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].completed_count, 6);
    assert_eq!(history[0].duration_secs, 12 * 60);

    match notices.try_recv() {
        Ok(SessionNotice::SessionEnded { summary }) => assert_eq!(summary.recipe_name, "Pasta"),
        other => panic!("expected a session-ended notice, got {:?}", other),
    }
}

#[tokio::test]
async fn test_paused_timer_ignores_paused_time() {
    let (service, _store, clock) = fresh().await;
    service.start_session(pasta(), StartOptions::default()).await;
    assert!(
        service
            .start_timer(
                180,
                TimerOptions {
                    step_id: Some("step-1".to_string()),
                    label: Some("Boil".to_string()),
                },
            )
            .await
    );

    clock.advance(Duration::seconds(5));
    service.tick().await;
    assert_eq!(service.view().timer.remaining_time, 175);

    assert!(service.pause_timer().await);
    clock.advance(Duration::seconds(10));
    assert!(service.resume_timer().await);
    assert_eq!(service.view().timer.remaining_time, 175);
    assert_eq!(service.view().timer.formatted_text, "2:55");

    clock.advance(Duration::seconds(1));
    service.tick().await;
    assert_eq!(service.view().timer.remaining_time, 174);
}

#[tokio::test]
async fn test_timer_expiry_is_announced_once() {
    let (service, _store, clock) = fresh().await;
    let mut notices = service.events();
    service.start_session(pasta(), StartOptions::default()).await;
    service.start_timer(2, TimerOptions::default()).await;

    clock.advance(Duration::seconds(3));
    service.tick().await;
    service.tick().await;

    let view = service.view();
    assert!(view.timer.is_expired);
    assert_eq!(view.timer.remaining_time, 0);
    assert!(matches!(
        notices.try_recv(),
        Ok(SessionNotice::TimerExpired { .. })
    ));
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn test_paused_session_rejects_navigation() {
    let (service, _store, _clock) = fresh().await;
    service.start_session(pasta(), StartOptions::default()).await;
    assert!(service.pause_session().await);
    assert!(!service.next_step().await);
    assert!(!service.start_timer(60, TimerOptions::default()).await);
    assert!(service.resume_session().await);
    assert!(service.next_step().await);
    assert_eq!(service.view().current_step, 2);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).await.unwrap());
        let service = service_with(store, clock.clone(), SessionSettings::default()).await;
        service.start_session(pasta(), StartOptions::default()).await;
        service.go_to_step(3).await;
        service.start_timer(600, TimerOptions::default()).await;
        clock.advance(Duration::seconds(30));
        service.tick().await;
        service.shutdown().await;
    }

    clock.advance(Duration::hours(1));
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).await.unwrap());
    let service = service_with(store, clock.clone(), SessionSettings::default()).await;

    let view = service.view();
    assert!(view.is_active);
    assert_eq!(view.current_step, 3);
    assert_eq!(view.completed_count, 1);
    assert!(view.timer.is_paused);
    assert_eq!(view.timer.remaining_time, 570);

    let session = service.session().await.unwrap();
    assert_eq!(session.timer.phase, TimerPhase::Paused);
    assert_eq!(session.last_active_at, clock.now());
}

#[tokio::test]
async fn test_stale_session_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    {
        let service = service_with(store.clone(), clock.clone(), SessionSettings::default()).await;
        service.start_session(pasta(), StartOptions::default()).await;
        service.flush().await;
        service.shutdown().await;
    }
    assert!(store.get(ACTIVE_SESSION_KEY).await.unwrap().is_some());

    clock.advance(Duration::hours(25));
    let service = service_with(store.clone(), clock, SessionSettings::default()).await;
    assert!(!service.view().is_active);
    assert_eq!(store.get(ACTIVE_SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_unresumable_blob_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    {
        let service = service_with(store.clone(), clock.clone(), SessionSettings::default()).await;
        service.start_session(pasta(), StartOptions::default()).await;
        let mut session = service.session().await.unwrap();
        session.status = SessionStatus::Completed;
        service.shutdown().await;
        store
            .set(ACTIVE_SESSION_KEY, &encode_session(&session).unwrap())
            .await
            .unwrap();
    }

    let service = service_with(store.clone(), clock, SessionSettings::default()).await;
    assert!(!service.view().is_active);
    assert_eq!(store.get(ACTIVE_SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_end_session_clears_storage_before_returning() {
    let (service, store, _clock) = fresh().await;
    service.start_session(pasta(), StartOptions::default()).await;
    service.flush().await;
    assert!(store.get(ACTIVE_SESSION_KEY).await.unwrap().is_some());

    assert!(service.end_session(false).await);
    assert_eq!(store.get(ACTIVE_SESSION_KEY).await.unwrap(), None);
    assert!(service.history().await.unwrap().is_empty());
    assert!(!service.end_session(true).await);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let settings = SessionSettings {
        history_limit: 3,
        ..SessionSettings::default()
    };
    let service = service_with(store, clock.clone(), settings).await;

    for i in 0..5 {
        let recipe = RecipeRef {
            id: format!("r-{}", i),
            title: format!("Recipe {}", i),
            step_count: 2,
        };
        assert!(service.start_session(recipe, StartOptions::default()).await);
        clock.advance(Duration::minutes(1));
        assert!(service.end_session(true).await);
    }

    let names: Vec<String> = service
        .history()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.recipe_name)
        .collect();
    assert_eq!(names, vec!["Recipe 4", "Recipe 3", "Recipe 2"]);
}

#[tokio::test]
async fn test_history_respects_preferences() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let training = TrainingStore::new(store.clone(), clock.clone());
    training
        .set_preferences(&DataCollectionPreferences {
            manual_parsing_enabled: true,
            session_history_enabled: false,
        })
        .await
        .unwrap();

    let service = service_with(store, clock, SessionSettings::default()).await;
    service.start_session(pasta(), StartOptions::default()).await;
    assert!(service.end_session(true).await);
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_view_subscription_sees_changes() {
    let (service, _store, _clock) = fresh().await;
    let mut views = service.subscribe();
    service.start_session(pasta(), StartOptions::default()).await;
    views.changed().await.unwrap();
    assert_eq!(views.borrow_and_update().current_step, 1);

    service.go_to_step(4).await;
    views.changed().await.unwrap();
    assert_eq!(views.borrow_and_update().current_step, 4);
}

#[tokio::test]
async fn test_session_runs_on_without_storage() {
    let clock = Arc::new(ManualClock::new(t0()));
    let service = service_with(
        Arc::new(UnavailableStore),
        clock.clone(),
        SessionSettings::default(),
    )
    .await;
    assert!(!service.view().is_active);

    assert!(service.start_session(pasta(), StartOptions::default()).await);
    service.flush().await;
    clock.advance(Duration::minutes(1));
    assert!(service.next_step().await);
    assert!(service.start_timer(90, TimerOptions::default()).await);
    service.flush().await;

    let view = service.view();
    assert!(view.is_active);
    assert_eq!(view.current_step, 2);
    assert_eq!(view.timer.remaining_time, 90);

    assert!(service.end_session(true).await);
    assert!(!service.view().is_active);
    assert!(service.history().await.is_err());
    assert!(service.start_session(pasta(), StartOptions::default()).await);
}

#[tokio::test]
async fn test_oversized_timer_is_refused() {
    let (service, _store, _clock) = fresh().await;
    service.start_session(pasta(), StartOptions::default()).await;
    assert!(!service.start_timer(u64::MAX, TimerOptions::default()).await);
    assert!(!service.start_timer(10_000_000_000_000, TimerOptions::default()).await);

    let view = service.view();
    assert!(view.is_active);
    assert!(!view.timer.is_active);
    assert!(service.start_timer(24 * 60 * 60, TimerOptions::default()).await);
    assert_eq!(service.view().timer.formatted_text, "24:00:00");
}
