//! services/kitchen/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use crate::config::Config;
use crate::session::CookingSessionService;
use crate::training::TrainingStore;
use sous_core::heuristics::TextHeuristics;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: CookingSessionService,
    pub training: Arc<TrainingStore>,
    pub heuristics: Arc<dyn TextHeuristics>,
}
