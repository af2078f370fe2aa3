//! crates/sous_core/src/training.rs
//!
//! The export document for manual-parsing training examples.

use crate::domain::{ManualParsing, ManualParsingExample, Token};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRAINING_EXPORT_VERSION: &str = "1.0";

/// `{exportDate, version, data: [...]}` as written by the training export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingExport {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub data: Vec<ManualParsingExample>,
}

impl TrainingExport {
    pub fn new(examples: Vec<ManualParsingExample>, export_date: DateTime<Utc>) -> Self {
        Self {
            export_date,
            version: TRAINING_EXPORT_VERSION.to_string(),
            data: examples,
        }
    }

    /// Returns the examples with every derived field recomputed from their tokens.
    ///
    /// Whatever the file says about quantity, unit or structure is ignored; the
    /// token assignment is the only source of truth.
    pub fn into_examples(self) -> Vec<ManualParsingExample> {
        self.data
            .into_iter()
            .map(|example| {
                let manual_parsing = ManualParsing::from_tokens(
                    &example.original_text,
                    &example.manual_parsing.parts,
                );
                ManualParsingExample {
                    manual_parsing,
                    ..example
                }
            })
            .collect()
    }
}

impl ManualParsingExample {
    /// Records a user's token assignment for `original_text`.
    pub fn new(
        id: impl Into<String>,
        original_text: &str,
        tokens: &[Token],
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            original_text: original_text.to_string(),
            manual_parsing: ManualParsing::from_tokens(original_text, tokens),
            timestamp,
        }
    }
}
