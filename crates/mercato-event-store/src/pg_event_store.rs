//! PostgreSQL implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_core::error::DomainError;
use mercato_core::store::{EventStore, RecordedEvent};
use sqlx::PgPool;

use crate::pool::DbPools;
use crate::schema::{AGGREGATE_VERSION_CONSTRAINT, EVENT_STORE_TABLE};

/// PostgreSQL-backed event store.
///
/// Appends run in explicit transactions on the transactional pool; all reads
/// go through the autocommit pool. The version check inside the write
/// transaction gives a precise conflict report, and the unique constraint on
/// `(aggregate_id, aggregate_version)` arbitrates writes that race past it.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pools: DbPools,
}

impl PgEventStore {
    /// Creates a new `PgEventStore` over the given pools.
    #[must_use]
    pub fn new(pools: DbPools) -> Self {
        Self { pools }
    }

    /// Creates a store that serves both pool roles from one pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(DbPools::from_pool(pool))
    }

    /// Reads the persisted version of an aggregate (0 if it has no events)
    /// on the autocommit pool.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StorageUnavailable`] on connectivity failures.
    pub async fn current_version(&self, aggregate_id: &str) -> Result<i64, DomainError> {
        let sql = format!(
            "SELECT COALESCE(MAX(aggregate_version), 0) FROM {EVENT_STORE_TABLE} WHERE aggregate_id = $1"
        );
        sqlx::query_scalar(&sql)
            .bind(aggregate_id)
            .fetch_one(&self.pools.autocommit)
            .await
            .map_err(storage_error)
    }
}

/// Row mapping local to this crate so `mercato-core` stays sqlx-free.
#[derive(sqlx::FromRow)]
struct EventRow {
    global_seq: i64,
    create_dt: DateTime<Utc>,
    aggregate_id: String,
    aggregate_version: i64,
    aggregate_type: String,
    payload: serde_json::Value,
}

impl From<EventRow> for RecordedEvent {
    fn from(row: EventRow) -> Self {
        Self {
            global_seq: row.global_seq,
            create_dt: row.create_dt,
            aggregate_id: row.aggregate_id,
            aggregate_version: row.aggregate_version,
            aggregate_type: row.aggregate_type,
            payload: row.payload,
        }
    }
}

fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::StorageUnavailable(err.to_string())
}

fn is_version_conflict(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(AGGREGATE_VERSION_CONSTRAINT)
    )
}

#[async_trait]
impl EventStore for PgEventStore {
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

        let mut tx = self
            .pools
            .transactional
            .begin()
            .await
            .map_err(storage_error)?;

        let version_sql = format!(
            "SELECT COALESCE(MAX(aggregate_version), 0) FROM {EVENT_STORE_TABLE} WHERE aggregate_id = $1"
        );
        let actual: i64 = sqlx::query_scalar(&version_sql)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
        if actual != expected_version {
            tracing::warn!(
                aggregate_id,
                expected = expected_version,
                actual,
                "append rejected: stale expected version"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let insert_sql = format!(
            "INSERT INTO {EVENT_STORE_TABLE} (aggregate_id, aggregate_version, aggregate_type, payload) \
             VALUES ($1, $2, $3, $4)"
        );
        let mut version = expected_version;
        for payload in payloads {
            version += 1;
            let inserted = sqlx::query(&insert_sql)
                .bind(aggregate_id)
                .bind(version)
                .bind(aggregate_type)
                .bind(payload)
                .execute(&mut *tx)
                .await;
            if let Err(err) = inserted {
                if is_version_conflict(&err) {
                    // A concurrent writer claimed this version after our
                    // check; the constraint is the arbiter. Roll back and
                    // report the version that actually won.
                    drop(tx);
                    let actual = self.current_version(aggregate_id).await?;
                    tracing::warn!(
                        aggregate_id,
                        expected = expected_version,
                        actual,
                        "append rejected: lost version race"
                    );
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.to_string(),
                        expected: expected_version,
                        actual,
                    });
                }
                return Err(storage_error(err));
            }
        }

        tx.commit().await.map_err(storage_error)?;
        tracing::debug!(
            aggregate_id,
            aggregate_type,
            new_version = version,
            events = payloads.len(),
            "events appended"
        );
        Ok(version)
    }

    async fn read_all(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, DomainError> {
        let sql = format!(
            "SELECT global_seq, create_dt, aggregate_id, aggregate_version, aggregate_type, payload \
             FROM {EVENT_STORE_TABLE} WHERE aggregate_id = $1 ORDER BY aggregate_version ASC"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(aggregate_id)
            .fetch_all(&self.pools.autocommit)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(RecordedEvent::from).collect())
    }

    async fn read_log(&self) -> Result<Vec<RecordedEvent>, DomainError> {
        let sql = format!(
            "SELECT global_seq, create_dt, aggregate_id, aggregate_version, aggregate_type, payload \
             FROM {EVENT_STORE_TABLE} ORDER BY global_seq ASC"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pools.autocommit)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(RecordedEvent::from).collect())
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
        let sql = format!(
            "SELECT global_seq, create_dt, aggregate_id, aggregate_version, aggregate_type, payload \
             FROM {EVENT_STORE_TABLE} WHERE global_seq > $1 ORDER BY global_seq ASC LIMIT $2"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(after_seq)
            .bind(limit)
            .fetch_all(&self.pools.autocommit)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(RecordedEvent::from).collect())
    }
}
