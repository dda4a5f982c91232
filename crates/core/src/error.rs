use std::fmt::Display;

use crate::types::BatchId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Retry requested while the batch has no failed rows waiting, either
    /// because its last pass was clean or because a pass is still running.
    #[error("No failed hospitals pending retry for batch {0}")]
    NoPendingRetry(BatchId),
}

impl CoreError {
    /// Shorthand for the `NotFound` error every batch accessor returns.
    ///
    /// Takes anything printable so ids that never parsed as a [`BatchId`]
    /// report the same way as unknown ones.
    pub fn batch_not_found(id: impl Display) -> Self {
        Self::NotFound {
            entity: "Batch",
            id: id.to_string(),
        }
    }
}
