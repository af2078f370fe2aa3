//! services/kitchen/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the cooking screen and the
//! kitchen service.

use serde::{Deserialize, Serialize};
use sous_core::session::{CompletionSummary, SessionView};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// The intents a cooking screen can send while a session is shown.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    NextStep,
    PreviousStep,
    /// Jump to a one-based step number.
    GoToStep { step: usize },
    StartTimer {
        duration_secs: u64,
        #[serde(default)]
        step_id: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
    StopTimer,
    /// Pause a running timer or resume a paused one.
    ToggleTimer,
}

impl ClientMessage {
    pub fn command_name(&self) -> &'static str {
        match self {
            ClientMessage::NextStep => "next_step",
            ClientMessage::PreviousStep => "previous_step",
            ClientMessage::GoToStep { .. } => "go_to_step",
            ClientMessage::StartTimer { .. } => "start_timer",
            ClientMessage::StopTimer => "stop_timer",
            ClientMessage::ToggleTimer => "toggle_timer",
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The latest derived view. Sent on connect and after every change.
    SessionUpdated { view: SessionView },

    /// A step timer reached zero. The UI should alert the cook.
    TimerExpired {
        step_id: Option<String>,
        label: Option<String>,
    },

    /// The session finished or was ended.
    SessionEnded { summary: CompletionSummary },

    /// The named command was not valid in the current state; nothing changed.
    CommandRejected { command: String },

    /// The client sent something the server could not understand.
    Error { message: String },
}
