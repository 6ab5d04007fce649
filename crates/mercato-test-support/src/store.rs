//! Test event stores — in-memory and failing `EventStore` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use mercato_core::error::DomainError;
use mercato_core::store::{EventStore, RecordedEvent};

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<RecordedEvent>,
    next_seq: i64,
}

/// An in-memory event store with the same optimistic-concurrency semantics
/// as the PostgreSQL implementation: gapless per-aggregate versions, a
/// process-local monotonic global sequence, and whole-batch rejection on a
/// stale expected version.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Inner>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rows.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        expected_version: i64,
        payloads: &[serde_json::Value],
    ) -> Result<i64, DomainError> {
        if aggregate_id.trim().is_empty() {
            return Err(DomainError::Validation("aggregate_id must not be empty".into()));
        }
        if aggregate_type.trim().is_empty() {
            return Err(DomainError::Validation(
                "aggregate_type must not be empty".into(),
            ));
        }
        if expected_version < 0 {
            return Err(DomainError::Validation(format!(
                "expected_version must not be negative, got {expected_version}"
            )));
        }
        if payloads.is_empty() {
            return Ok(expected_version);
        }

        let mut inner = self.inner.lock().unwrap();
        let actual = inner
            .rows
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .map(|r| r.aggregate_version)
            .max()
            .unwrap_or(0);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let mut version = expected_version;
        for payload in payloads {
            version += 1;
            inner.next_seq += 1;
            let row = RecordedEvent {
                global_seq: inner.next_seq,
                create_dt: Utc::now(),
                aggregate_id: aggregate_id.to_string(),
                aggregate_version: version,
                aggregate_type: aggregate_type.to_string(),
                payload: payload.clone(),
            };
            inner.rows.push(row);
        }
        Ok(version)
    }

    async fn read_all(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<RecordedEvent> = inner
            .rows
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.aggregate_version);
        Ok(rows)
    }

    async fn read_log(&self) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self.inner.lock().unwrap().rows.clone())
    }

    async fn read_log_after(
        &self,
        after_seq: i64,
        limit: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        if limit <= 0 {
            return Err(DomainError::Validation(format!(
                "limit must be positive, got {limit}"
            )));
        }
        let inner = self.inner.lock().unwrap();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.global_seq > after_seq)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// An event store that always fails with `StorageUnavailable`. Useful for
/// testing error-handling paths.
#[derive(Debug, Default)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
        _expected_version: i64,
        _payloads: &[serde_json::Value],
    ) -> Result<i64, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    async fn read_all(&self, _aggregate_id: &str) -> Result<Vec<RecordedEvent>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    async fn read_log(&self) -> Result<Vec<RecordedEvent>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    async fn read_log_after(
        &self,
        _after_seq: i64,
        _limit: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }
}
