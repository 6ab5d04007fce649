//! Domain event abstractions.

/// Trait that all domain events implement.
///
/// Events are persisted as JSON documents; the type name routes
/// deserialization when an aggregate is rehydrated.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;
}
