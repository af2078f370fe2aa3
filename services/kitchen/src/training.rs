//! services/kitchen/src/training.rs
//!
//! Stores the manual-parsing examples users choose to contribute, along with
//! the data-collection preferences that gate them.

use sous_core::domain::{DataCollectionPreferences, ManualParsingExample, Token};
use sous_core::ports::{Clock, KeyValueStore, PortError};
use sous_core::session::snapshot::{PREFERENCES_KEY, TRAINING_EXAMPLES_KEY};
use sous_core::training::{TrainingExport, TRAINING_EXPORT_VERSION};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("manual parsing collection is disabled")]
    CollectionDisabled,
    #[error(transparent)]
    Port(#[from] PortError),
}

impl From<serde_json::Error> for TrainingError {
    fn from(e: serde_json::Error) -> Self {
        TrainingError::Port(PortError::Serialization(e))
    }
}

pub struct TrainingStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write cycles on the examples key.
    write_lock: Mutex<()>,
}

impl TrainingStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn preferences(&self) -> Result<DataCollectionPreferences, TrainingError> {
        match self.store.get(PREFERENCES_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(DataCollectionPreferences::default()),
        }
    }

    pub async fn set_preferences(
        &self,
        preferences: &DataCollectionPreferences,
    ) -> Result<(), TrainingError> {
        let json = serde_json::to_string(preferences)?;
        self.store.set(PREFERENCES_KEY, &json).await?;
        info!(
            "Data collection preferences updated (manual parsing: {}, history: {}).",
            preferences.manual_parsing_enabled, preferences.session_history_enabled
        );
        Ok(())
    }

    /// Stores `example`, replacing any earlier one with the same id.
    pub async fn save(&self, example: ManualParsingExample) -> Result<(), TrainingError> {
        if !self.preferences().await?.manual_parsing_enabled {
            return Err(TrainingError::CollectionDisabled);
        }
        let _guard = self.write_lock.lock().await;
        let mut examples = self.load().await?;
        upsert(&mut examples, example);
        self.persist(&examples).await
    }

    /// Builds an example from a token assignment and stores it.
    pub async fn record(
        &self,
        original_text: &str,
        tokens: &[Token],
    ) -> Result<ManualParsingExample, TrainingError> {
        let example = ManualParsingExample::new(
            Uuid::new_v4().to_string(),
            original_text,
            tokens,
            self.clock.now(),
        );
        self.save(example.clone()).await?;
        Ok(example)
    }

    pub async fn list(&self) -> Result<Vec<ManualParsingExample>, TrainingError> {
        self.load().await
    }

    /// Returns whether an example with `id` existed.
    pub async fn delete(&self, id: &str) -> Result<bool, TrainingError> {
        let _guard = self.write_lock.lock().await;
        let mut examples = self.load().await?;
        let before = examples.len();
        examples.retain(|e| e.id != id);
        if examples.len() == before {
            return Ok(false);
        }
        self.persist(&examples).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), TrainingError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(TRAINING_EXAMPLES_KEY).await?;
        Ok(())
    }

    pub async fn export(&self) -> Result<TrainingExport, TrainingError> {
        Ok(TrainingExport::new(self.load().await?, self.clock.now()))
    }

    /// Merges an export into the stored examples by id and returns how many
    /// examples it carried. Structured records are rebuilt from the tokens.
    pub async fn import(&self, document: TrainingExport) -> Result<usize, TrainingError> {
        if document.version != TRAINING_EXPORT_VERSION {
            warn!(
                "Importing training export version '{}' (expected '{}').",
                document.version, TRAINING_EXPORT_VERSION
            );
        }
        let incoming = document.into_examples();
        let count = incoming.len();

        let _guard = self.write_lock.lock().await;
        let mut examples = self.load().await?;
        for example in incoming {
            upsert(&mut examples, example);
        }
        self.persist(&examples).await?;
        info!("Imported {} training examples.", count);
        Ok(count)
    }

    async fn load(&self) -> Result<Vec<ManualParsingExample>, TrainingError> {
        match self.store.get(TRAINING_EXAMPLES_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, examples: &[ManualParsingExample]) -> Result<(), TrainingError> {
        let json = serde_json::to_string(examples)?;
        self.store.set(TRAINING_EXAMPLES_KEY, &json).await?;
        Ok(())
    }
}

fn upsert(examples: &mut Vec<ManualParsingExample>, example: ManualParsingExample) {
    match examples.iter_mut().find(|e| e.id == example.id) {
        Some(existing) => *existing = example,
        None => examples.push(example),
    }
}
