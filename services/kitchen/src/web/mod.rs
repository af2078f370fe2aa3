pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use crate::web::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that builds the web server router.
pub use ws_handler::ws_handler;

/// All API routes, ready for middleware layers.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/session",
            get(rest::get_session_handler)
                .post(rest::start_session_handler)
                .delete(rest::end_session_handler),
        )
        .route("/session/pause", post(rest::pause_session_handler))
        .route("/session/resume", post(rest::resume_session_handler))
        .route("/session/history", get(rest::history_handler))
        .route("/ingredients/segment", post(rest::segment_handler))
        .route("/ingredients/structure", post(rest::structure_handler))
        .route("/steps/resync", post(rest::resync_handler))
        .route("/training/export", get(rest::export_training_handler))
        .route("/training/import", post(rest::import_training_handler))
        .route(
            "/training/examples",
            post(rest::save_example_handler).delete(rest::clear_examples_handler),
        )
        .route("/training/examples/{id}", delete(rest::delete_example_handler))
        .route(
            "/preferences",
            get(rest::get_preferences_handler).put(rest::put_preferences_handler),
        )
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
