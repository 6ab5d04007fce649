//! Shared test doubles and helpers for the Mercato transaction backend.

mod ids;
mod store;

pub use ids::unique_aggregate_id;
pub use store::{FailingEventStore, InMemoryEventStore};
