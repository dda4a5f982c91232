//! Contract of the upstream Hospital Directory service.
//!
//! The batch processor only talks to the directory through
//! [`DirectoryClient`], so tests can drive it with an in-process fake while
//! production uses the reqwest implementation in `hospital-directory`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::BatchId;

/// Body of a hospital creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHospital {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    /// Batch the hospital belongs to; activation flips every hospital
    /// carrying this id at once.
    pub creation_batch_id: BatchId,
}

/// Subset of the directory's hospital representation the processor uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedHospital {
    pub id: i64,
    pub name: String,
}

/// Why a directory call failed.
///
/// Every variant is recoverable from the processor's point of view: a
/// failed creation becomes a failed row, a failed activation clears the
/// batch's `activated` flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("Directory request failed: {0}")]
    Transport(String),

    /// The directory answered with a non-2xx status.
    #[error("Directory rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The directory answered 2xx but the body was not what we expect.
    #[error("Malformed directory response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Create one hospital.
    async fn create_hospital(
        &self,
        request: &CreateHospital,
    ) -> Result<CreatedHospital, DirectoryError>;

    /// Activate every hospital created under `batch_id`.
    async fn activate_batch(&self, batch_id: BatchId) -> Result<(), DirectoryError>;
}
