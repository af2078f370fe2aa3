//! services/kitchen/src/session/persistence.rs
//!
//! The single background worker that owns every session write to the
//! key-value store. Commands arrive over an unbounded channel in dispatch
//! order; consecutive snapshot and clear commands are coalesced within the
//! debounce window so only the latest one reaches storage.

use sous_core::domain::DataCollectionPreferences;
use sous_core::ports::{KeyValueStore, PortResult};
use sous_core::session::snapshot::{
    prepend_history, ACTIVE_SESSION_KEY, PREFERENCES_KEY, SESSION_HISTORY_KEY,
};
use sous_core::session::CompletionSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum PersistCommand {
    /// Replace the stored session blob.
    Save(String),
    /// Remove the stored session blob.
    Clear,
    /// Prepend a finished session to the history list.
    Record(CompletionSummary),
    /// Write whatever is pending, then acknowledge.
    Flush(oneshot::Sender<()>),
}

/// The latest not-yet-written change to the active session key.
enum Pending {
    Save(String),
    Clear,
}

/// Sending side of the worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistenceHandle {
    pub fn save(&self, json: String) {
        self.send(PersistCommand::Save(json));
    }

    pub fn clear(&self) {
        self.send(PersistCommand::Clear);
    }

    pub fn record(&self, summary: CompletionSummary) {
        self.send(PersistCommand::Record(summary));
    }

    /// Resolves once everything queued before this call has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(ack_tx)).is_err() {
            debug!("Persistence worker already stopped; nothing to flush.");
            return;
        }
        let _ = ack_rx.await;
    }

    fn send(&self, command: PersistCommand) {
        if self.tx.send(command).is_err() {
            warn!("Persistence worker is gone; dropping a session write.");
        }
    }
}

/// Starts the worker. It stops when `shutdown` fires or every handle is dropped,
/// writing any pending change on the way out.
pub fn spawn_worker(
    store: Arc<dyn KeyValueStore>,
    history_limit: usize,
    debounce: Duration,
    shutdown: CancellationToken,
) -> (PersistenceHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = PersistenceWorker {
        store,
        history_limit,
        debounce,
    };
    let handle = tokio::spawn(worker.run(rx, shutdown));
    (PersistenceHandle { tx }, handle)
}

struct PersistenceWorker {
    store: Arc<dyn KeyValueStore>,
    history_limit: usize,
    debounce: Duration,
}

impl PersistenceWorker {
    async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<PersistCommand>,
        shutdown: CancellationToken,
    ) {
        info!("Session persistence worker started.");
        let mut pending: Option<Pending> = None;
        let mut deadline = Instant::now();

        loop {
            let command = if pending.is_some() {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep_until(deadline) => {
                        self.write(pending.take()).await;
                        continue;
                    }
                    command = rx.recv() => command,
                }
            } else {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    command = rx.recv() => command,
                }
            };

            let Some(command) = command else { break };
            let was_idle = pending.is_none();
            self.handle(command, &mut pending).await;
            if was_idle && pending.is_some() {
                deadline = Instant::now() + self.debounce;
            }
        }

        // Drain whatever was already queued so a shutdown loses nothing.
        while let Ok(command) = rx.try_recv() {
            self.handle(command, &mut pending).await;
        }
        self.write(pending.take()).await;
        info!("Session persistence worker stopped.");
    }

    async fn handle(&self, command: PersistCommand, pending: &mut Option<Pending>) {
        match command {
            PersistCommand::Save(json) => *pending = Some(Pending::Save(json)),
            PersistCommand::Clear => *pending = Some(Pending::Clear),
            PersistCommand::Record(summary) => {
                self.write(pending.take()).await;
                if let Err(e) = self.record(summary).await {
                    warn!("Failed to append session history: {}", e);
                }
            }
            PersistCommand::Flush(ack) => {
                self.write(pending.take()).await;
                let _ = ack.send(());
            }
        }
    }

    async fn write(&self, pending: Option<Pending>) {
        let result = match pending {
            None => return,
            Some(Pending::Save(json)) => self.store.set(ACTIVE_SESSION_KEY, &json).await,
            Some(Pending::Clear) => self.store.remove(ACTIVE_SESSION_KEY).await,
        };
        if let Err(e) = result {
            warn!("Failed to persist the active session: {}", e);
        }
    }

    async fn record(&self, summary: CompletionSummary) -> PortResult<()> {
        let preferences = match self.store.get(PREFERENCES_KEY).await? {
            Some(raw) => {
                serde_json::from_str::<DataCollectionPreferences>(&raw).unwrap_or_default()
            }
            None => DataCollectionPreferences::default(),
        };
        if !preferences.session_history_enabled {
            debug!("Session history disabled; not recording {}.", summary.session_id);
            return Ok(());
        }

        let history: Vec<CompletionSummary> = match self.store.get(SESSION_HISTORY_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Stored session history is unreadable, starting over: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let history = prepend_history(history, summary, self.history_limit);
        let json = serde_json::to_string(&history)?;
        self.store.set(SESSION_HISTORY_KEY, &json).await
    }
}
