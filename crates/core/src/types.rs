use crate::error::CoreError;

/// Batches are identified by random v4 UUIDs allocated at upload time.
pub type BatchId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Parse a batch id taken from a request path.
///
/// A string that is not a UUID can never name a batch, so it is reported
/// as not found rather than malformed.
pub fn parse_batch_id(raw: &str) -> Result<BatchId, CoreError> {
    raw.parse().map_err(|_| CoreError::batch_not_found(raw))
}
