//! Event store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One persisted row of the append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Server-assigned position in the global log. Strictly increasing with
    /// insertion order, never reused; gaps from rolled-back writes are
    /// permitted.
    pub global_seq: i64,
    /// Server-assigned creation timestamp.
    pub create_dt: DateTime<Utc>,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// 1-based position within the aggregate stream; gapless per aggregate.
    pub aggregate_version: i64,
    /// Aggregate type label for routing and diagnostics.
    pub aggregate_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
}

/// Append-only event store with optimistic concurrency control.
///
/// `expected_version` is the last version the caller observed (0 for a new
/// aggregate). A mismatch at commit time fails the whole batch with
/// [`DomainError::ConcurrencyConflict`]; no partial rows survive. Retrying is
/// a caller concern and must start from a fresh read.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one row per payload with consecutive versions starting at
    /// `expected_version + 1`. Returns the new aggregate version. An empty
    /// batch is a no-op returning `expected_version`.
    ///
    /// # Errors
    ///
    /// [`DomainError::ConcurrencyConflict`] if the persisted version no longer
    /// equals `expected_version`; [`DomainError::Validation`] on malformed
    /// input; [`DomainError::StorageUnavailable`] on connectivity failures.
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        expected_version: i64,
        payloads: &[serde_json::Value],
    ) -> Result<i64, DomainError>;

    /// Loads all events for one aggregate, ordered by ascending version.
    /// Unknown aggregates yield an empty list.
    ///
    /// # Errors
    ///
    /// [`DomainError::StorageUnavailable`] on connectivity failures.
    async fn read_all(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Loads the full event log ordered by ascending `global_seq`, for
    /// sequential replay into external projections.
    ///
    /// # Errors
    ///
    /// [`DomainError::StorageUnavailable`] on connectivity failures.
    async fn read_log(&self) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Loads up to `limit` events with `global_seq > after_seq`, ordered
    /// ascending. Feeding the last seen `global_seq` back in resumes the
    /// replay, so a projection can restart from where it left off.
    ///
    /// # Errors
    ///
    /// [`DomainError::Validation`] if `limit` is not positive;
    /// [`DomainError::StorageUnavailable`] on connectivity failures.
    async fn read_log_after(
        &self,
        after_seq: i64,
        limit: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError>;
}
