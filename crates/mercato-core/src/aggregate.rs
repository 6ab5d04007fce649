//! Aggregate root abstraction and event replay.

use serde::de::DeserializeOwned;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::store::RecordedEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// `version` is the optimistic-concurrency token: it is read before handling
/// a command and handed back to the store as the expected version when the
/// resulting events are appended.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent + DeserializeOwned;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &str;

    /// Returns the aggregate type label recorded with each event.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state (used during reconstitution).
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);
}

/// Folds an ordered event history back into an aggregate.
///
/// The history must come from a single aggregate stream ordered by ascending
/// version, as produced by `EventStore::read_all`.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] if a record belongs to a different
/// aggregate or its payload does not decode into the aggregate's event type.
pub fn rehydrate<A: AggregateRoot>(
    aggregate: &mut A,
    history: &[RecordedEvent],
) -> Result<(), DomainError> {
    for record in history {
        if record.aggregate_id != aggregate.aggregate_id() {
            return Err(DomainError::Validation(format!(
                "event for aggregate {} replayed into aggregate {}",
                record.aggregate_id,
                aggregate.aggregate_id()
            )));
        }
        let event: A::Event = serde_json::from_value(record.payload.clone()).map_err(|e| {
            DomainError::Validation(format!(
                "undecodable payload at version {} of aggregate {}: {e}",
                record.aggregate_version, record.aggregate_id
            ))
        })?;
        aggregate.apply(&event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum OrderEvent {
        Created { customer: String },
        ItemAdded { sku: String, quantity: i64 },
    }

    impl DomainEvent for OrderEvent {
        fn event_type(&self) -> &'static str {
            match self {
                OrderEvent::Created { .. } => "order_created",
                OrderEvent::ItemAdded { .. } => "order_item_added",
            }
        }

        fn to_payload(&self) -> serde_json::Value {
            serde_json::to_value(self).unwrap()
        }
    }

    #[derive(Debug, Default)]
    struct Order {
        id: String,
        version: i64,
        customer: String,
        item_count: i64,
        uncommitted: Vec<OrderEvent>,
    }

    impl Order {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                ..Self::default()
            }
        }

        fn record(&mut self, event: OrderEvent) {
            self.apply(&event);
            self.uncommitted.push(event);
        }

        fn create(&mut self, customer: &str) {
            self.record(OrderEvent::Created {
                customer: customer.to_string(),
            });
        }

        fn add_item(&mut self, sku: &str, quantity: i64) {
            self.record(OrderEvent::ItemAdded {
                sku: sku.to_string(),
                quantity,
            });
        }
    }

    impl AggregateRoot for Order {
        type Event = OrderEvent;

        fn aggregate_id(&self) -> &str {
            &self.id
        }

        fn aggregate_type(&self) -> &'static str {
            "order"
        }

        fn version(&self) -> i64 {
            self.version
        }

        fn apply(&mut self, event: &OrderEvent) {
            match event {
                OrderEvent::Created { customer } => self.customer.clone_from(customer),
                OrderEvent::ItemAdded { quantity, .. } => self.item_count += quantity,
            }
            self.version += 1;
        }

        fn uncommitted_events(&self) -> &[OrderEvent] {
            &self.uncommitted
        }

        fn clear_uncommitted_events(&mut self) {
            self.uncommitted.clear();
        }
    }

    fn to_record(aggregate_id: &str, version: i64, event: &OrderEvent) -> RecordedEvent {
        RecordedEvent {
            global_seq: version,
            create_dt: Utc::now(),
            aggregate_id: aggregate_id.to_string(),
            aggregate_version: version,
            aggregate_type: "order".to_string(),
            payload: event.to_payload(),
        }
    }

    #[test]
    fn test_rehydrate_reconstructs_in_memory_state() {
        let mut live = Order::new("order-42");
        live.create("ada");
        live.add_item("sku-1", 2);
        live.add_item("sku-2", 3);

        let history: Vec<RecordedEvent> = live
            .uncommitted_events()
            .iter()
            .enumerate()
            .map(|(i, e)| to_record("order-42", i64::try_from(i).unwrap() + 1, e))
            .collect();

        let mut replayed = Order::new("order-42");
        rehydrate(&mut replayed, &history).unwrap();

        assert_eq!(replayed.version(), live.version());
        assert_eq!(replayed.customer, live.customer);
        assert_eq!(replayed.item_count, live.item_count);
        assert!(replayed.uncommitted_events().is_empty());
    }

    #[test]
    fn test_rehydrate_rejects_foreign_aggregate_record() {
        let mut order = Order::new("order-1");
        let record = to_record(
            "order-2",
            1,
            &OrderEvent::Created {
                customer: "ada".to_string(),
            },
        );

        let result = rehydrate(&mut order, &[record]);

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn test_rehydrate_rejects_undecodable_payload() {
        let mut order = Order::new("order-1");
        let mut record = to_record(
            "order-1",
            1,
            &OrderEvent::Created {
                customer: "ada".to_string(),
            },
        );
        record.payload = serde_json::json!({"type": "no_such_event"});

        let result = rehydrate(&mut order, &[record]);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_clear_uncommitted_events_keeps_state() {
        let mut order = Order::new("order-1");
        order.create("ada");
        order.add_item("sku-1", 1);
        assert_eq!(order.uncommitted_events().len(), 2);

        order.clear_uncommitted_events();

        assert!(order.uncommitted_events().is_empty());
        assert_eq!(order.version(), 2);
        assert_eq!(order.item_count, 1);
    }
}
