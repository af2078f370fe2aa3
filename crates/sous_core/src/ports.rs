//! crates/sous_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete storage and clock implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A durable string key-value store. Every value written through it is JSON.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key has never been written or was removed.
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> PortResult<()>;
}

/// The source of wall-clock time for timers and session bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
