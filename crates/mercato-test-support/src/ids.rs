//! Aggregate-id helpers for tests.

use uuid::Uuid;

/// Returns a fresh aggregate id with a readable prefix, unique across
/// concurrently running tests sharing one database.
#[must_use]
pub fn unique_aggregate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
