//! Built-in derived objects over the event store.
//!
//! All names carry the `trx_` prefix so the bulk teardown procedure can
//! distinguish generated functions from extension-owned ones.

use mercato_core::error::DomainError;

use crate::ddl::{DdlRegistry, DerivedObject, TriggerEvent, TriggerWhen};
use crate::schema::EVENT_STORE_TABLE;

/// Aggregate summary view: one row per aggregate with its current version,
/// event count, and last event timestamp.
pub const AGGREGATE_SUMMARY_VIEW: &str = "trx_v_aggregate_summary";

/// Trigger function raising on any mutation of an event row.
pub const FORBID_MUTATION_FUNCTION: &str = "trx_tf_forbid_event_mutation";

/// Trigger attaching the append-only guard to the event table.
pub const FORBID_MUTATION_TRIGGER: &str = "trx_tr_forbid_event_mutation";

/// Builds the registry of derived objects shipped with the event store.
///
/// Registration order matters: the trigger function precedes the trigger
/// that executes it.
///
/// # Errors
///
/// Returns [`DomainError::InvalidDescriptor`] if a built-in descriptor is
/// malformed; this fails fast before any schema work.
pub fn default_registry() -> Result<DdlRegistry, DomainError> {
    let mut registry = DdlRegistry::new();

    registry.register(DerivedObject::view(
        AGGREGATE_SUMMARY_VIEW,
        &format!(
            "SELECT aggregate_id, \
                    aggregate_type, \
                    MAX(aggregate_version) AS aggregate_version, \
                    COUNT(*) AS event_count, \
                    MAX(create_dt) AS last_event_dt \
             FROM {EVENT_STORE_TABLE} \
             GROUP BY aggregate_id, aggregate_type"
        ),
    ))?;

    registry.register(DerivedObject::function(
        FORBID_MUTATION_FUNCTION,
        &format!(
            "RETURNS TRIGGER AS $$ \
             BEGIN \
                 RAISE EXCEPTION '{EVENT_STORE_TABLE} is append-only'; \
             END; \
             $$ LANGUAGE plpgsql;"
        ),
    ))?;

    registry.register(
        DerivedObject::trigger(
            FORBID_MUTATION_TRIGGER,
            &format!("FOR EACH ROW EXECUTE FUNCTION {FORBID_MUTATION_FUNCTION}()"),
        )
        .when(TriggerWhen::Before)
        .on_event(TriggerEvent::Update)
        .on_event(TriggerEvent::Delete)
        .on_table(EVENT_STORE_TABLE),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DERIVED_OBJECT_PREFIX;

    #[test]
    fn test_default_registry_registers_three_objects() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_function_precedes_its_trigger() {
        let registry = default_registry().unwrap();
        let names: Vec<&str> = registry.pairs().iter().map(|p| p.name.as_str()).collect();
        let function_pos = names
            .iter()
            .position(|n| *n == FORBID_MUTATION_FUNCTION)
            .unwrap();
        let trigger_pos = names
            .iter()
            .position(|n| *n == FORBID_MUTATION_TRIGGER)
            .unwrap();
        assert!(function_pos < trigger_pos);
    }

    #[test]
    fn test_all_names_carry_teardown_prefix() {
        let registry = default_registry().unwrap();
        for pair in registry.pairs() {
            assert!(pair.name.starts_with(DERIVED_OBJECT_PREFIX), "{}", pair.name);
        }
    }
}
