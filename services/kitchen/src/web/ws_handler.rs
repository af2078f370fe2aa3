//! services/kitchen/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! The connection pushes every session change to the cooking screen and turns
//! the screen's intents into facade commands.

use crate::session::{CookingSessionService, SessionNotice, TimerOptions};
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let sessions = app_state.sessions.clone();

    // --- 1. Push Phase: initial view, then every change ---
    let initial = ServerMessage::SessionUpdated {
        view: sessions.view(),
    };
    if send(&ws_sender, &initial).await.is_err() {
        error!("Failed to send the initial session view.");
        return;
    }

    let token = CancellationToken::new();
    let push_task = {
        let sessions = sessions.clone();
        let ws_sender = ws_sender.clone();
        let token = token.clone();
        tokio::spawn(async move { push_updates(sessions, ws_sender, token).await })
    };

    // --- 2. Main Message Loop ---
    loop {
        let Some(Ok(msg)) = receiver.next().await else {
            info!("Client disconnected.");
            break;
        };
        match msg {
            Message::Text(text) => handle_text_message(text.as_str(), &sessions, &ws_sender).await,
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    token.cancel();
    if let Err(e) = push_task.await {
        warn!("Push task ended abnormally: {:?}", e);
    }
    info!("WebSocket connection closed.");
}

/// Forwards view changes and notices until the connection goes away.
async fn push_updates(
    sessions: CookingSessionService,
    ws_sender: WsSender,
    token: CancellationToken,
) {
    let mut views = sessions.subscribe();
    let mut notices = sessions.events();
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                ServerMessage::SessionUpdated { view }
            }
            notice = notices.recv() => match notice {
                Ok(SessionNotice::TimerExpired { step_id, label }) => {
                    ServerMessage::TimerExpired { step_id, label }
                }
                Ok(SessionNotice::SessionEnded { summary }) => {
                    ServerMessage::SessionEnded { summary }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket push lagged; skipped {} notices.", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        if send(&ws_sender, &message).await.is_err() {
            info!("Client no longer reachable; stopping updates.");
            break;
        }
    }
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(text: &str, sessions: &CookingSessionService, ws_sender: &WsSender) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Unrecognized message: {}", e),
            };
            let _ = send(ws_sender, &reply).await;
            return;
        }
    };

    let command = client_msg.command_name();
    let accepted = match client_msg {
        ClientMessage::NextStep => sessions.next_step().await,
        ClientMessage::PreviousStep => sessions.previous_step().await,
        ClientMessage::GoToStep { step } => sessions.go_to_step(step).await,
        ClientMessage::StartTimer {
            duration_secs,
            step_id,
            label,
        } => {
            sessions
                .start_timer(duration_secs, TimerOptions { step_id, label })
                .await
        }
        ClientMessage::StopTimer => sessions.stop_timer().await,
        ClientMessage::ToggleTimer => sessions.toggle_timer().await,
    };

    if !accepted {
        let reply = ServerMessage::CommandRejected {
            command: command.to_string(),
        };
        let _ = send(ws_sender, &reply).await;
    }
}

async fn send(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return Ok(());
        }
    };
    ws_sender.lock().await.send(Message::Text(json.into())).await
}
