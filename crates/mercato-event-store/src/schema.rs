//! Event store schema names.
//!
//! The executable DDL lives in the workspace `migrations/` directory; these
//! constants keep queries and derived-object definitions in sync with it.

/// The append-only event table.
pub const EVENT_STORE_TABLE: &str = "transaction_event_store";

/// The database sequence feeding `global_seq`. The sequence is the single
/// allocator shared by all writers: values are assigned server-side at insert
/// time and never reused. A rolled-back write may waste a value, so gaps are
/// permitted.
pub const GLOBAL_SEQ_NAME: &str = "global_seq_on_event_store";

/// Unique constraint enforcing one row per (aggregate_id, aggregate_version).
/// This is the database-native arbiter for optimistic concurrency: two writes
/// racing for the same version cannot both commit. Its backing index doubles
/// as the composite index for per-aggregate ordered reads.
pub const AGGREGATE_VERSION_CONSTRAINT: &str = "uq_event_store_aggregate_version";

/// Prefix shared by all derived objects so the bulk teardown procedure can
/// recognize generated functions without touching extension-owned ones.
pub const DERIVED_OBJECT_PREFIX: &str = "trx_";
