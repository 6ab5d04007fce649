//! Domain error types.

use thiserror::Error;

/// Top-level error type for the persistence core.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Optimistic concurrency conflict: the expected version was stale at
    /// commit time. The caller must re-read the aggregate before retrying;
    /// the core never retries on its own.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: String,
        /// The version the caller expected.
        expected: i64,
        /// The version actually persisted.
        actual: i64,
    },

    /// A derived-object descriptor is missing required metadata.
    #[error("invalid derived-object descriptor: {0}")]
    InvalidDescriptor(String),

    /// The database is unreachable or the pool is exhausted.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Bulk teardown of derived objects hit something it could not resolve.
    #[error("schema teardown failure: {0}")]
    SchemaTeardownFailure(String),

    /// Malformed input to the core.
    #[error("validation error: {0}")]
    Validation(String),
}
