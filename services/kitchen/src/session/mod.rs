pub mod persistence;
pub mod service;

pub use service::{
    CookingSessionService, SessionNotice, SessionSettings, StartOptions, TimerOptions,
};
