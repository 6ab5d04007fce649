//! Derived-object DDL registry.
//!
//! Views, functions, procedures, and triggers are derived from base tables
//! and must be (re)created alongside schema migrations and torn down cleanly
//! between test runs. Each descriptor registered here is rendered into an
//! idempotent create-or-replace / drop-if-exists statement pair.

use mercato_core::error::DomainError;
use sqlx::PgPool;

/// Kind of database-side object a descriptor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// A `CREATE OR REPLACE VIEW`.
    View,
    /// A `CREATE OR REPLACE FUNCTION`.
    Function,
    /// A `CREATE OR REPLACE PROCEDURE`.
    Procedure,
    /// A `CREATE OR REPLACE TRIGGER`.
    Trigger,
}

impl ObjectType {
    fn keyword(self) -> &'static str {
        match self {
            ObjectType::View => "VIEW",
            ObjectType::Function => "FUNCTION",
            ObjectType::Procedure => "PROCEDURE",
            ObjectType::Trigger => "TRIGGER",
        }
    }
}

/// When a trigger fires relative to the triggering statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerWhen {
    /// Fires before the row/statement change.
    Before,
    /// Fires after the row/statement change.
    After,
}

impl TriggerWhen {
    fn keyword(self) -> &'static str {
        match self {
            TriggerWhen::Before => "BEFORE",
            TriggerWhen::After => "AFTER",
        }
    }
}

/// Statement kinds a trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Fires on INSERT.
    Insert,
    /// Fires on UPDATE.
    Update,
    /// Fires on DELETE.
    Delete,
}

impl TriggerEvent {
    fn keyword(self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

/// Declarative description of one derived database object.
///
/// `body` is the type-specific statement tail: the SELECT of a view, the
/// `RETURNS … AS $$ … $$` of a function or procedure, or the
/// `FOR EACH … EXECUTE …` tail of a trigger.
#[derive(Debug, Clone)]
pub struct DerivedObject {
    object_type: ObjectType,
    name: String,
    body: String,
    arguments: Vec<(String, String)>,
    trigger_when: Option<TriggerWhen>,
    trigger_events: Vec<TriggerEvent>,
    trigger_columns: Vec<String>,
    trigger_table: Option<String>,
}

impl DerivedObject {
    fn new(object_type: ObjectType, name: &str, body: &str) -> Self {
        Self {
            object_type,
            name: name.to_string(),
            body: body.to_string(),
            arguments: Vec::new(),
            trigger_when: None,
            trigger_events: Vec::new(),
            trigger_columns: Vec::new(),
            trigger_table: None,
        }
    }

    /// A view over the given query.
    #[must_use]
    pub fn view(name: &str, query: &str) -> Self {
        Self::new(ObjectType::View, name, query)
    }

    /// A function; `body` must carry the `RETURNS` clause onward.
    #[must_use]
    pub fn function(name: &str, body: &str) -> Self {
        Self::new(ObjectType::Function, name, body)
    }

    /// A procedure; `body` must carry the `AS $$ … $$` clause onward.
    #[must_use]
    pub fn procedure(name: &str, body: &str) -> Self {
        Self::new(ObjectType::Procedure, name, body)
    }

    /// A trigger; `body` is the `FOR EACH … EXECUTE …` tail. Requires
    /// [`when`](Self::when), at least one [`on_event`](Self::on_event), and
    /// [`on_table`](Self::on_table) before registration.
    #[must_use]
    pub fn trigger(name: &str, body: &str) -> Self {
        Self::new(ObjectType::Trigger, name, body)
    }

    /// Appends a `name type` pair to a function/procedure signature.
    #[must_use]
    pub fn argument(mut self, name: &str, sql_type: &str) -> Self {
        self.arguments.push((name.to_string(), sql_type.to_string()));
        self
    }

    /// Sets when the trigger fires.
    #[must_use]
    pub fn when(mut self, when: TriggerWhen) -> Self {
        self.trigger_when = Some(when);
        self
    }

    /// Adds a statement kind the trigger reacts to.
    #[must_use]
    pub fn on_event(mut self, event: TriggerEvent) -> Self {
        self.trigger_events.push(event);
        self
    }

    /// Restricts an UPDATE trigger to the given column (`OF` list).
    #[must_use]
    pub fn of_column(mut self, column: &str) -> Self {
        self.trigger_columns.push(column.to_string());
        self
    }

    /// Sets the table the trigger is attached to.
    #[must_use]
    pub fn on_table(mut self, table: &str) -> Self {
        self.trigger_table = Some(table.to_string());
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidDescriptor(
                "derived object requires a name".into(),
            ));
        }
        if self.body.trim().is_empty() {
            return Err(DomainError::InvalidDescriptor(format!(
                "derived object {} requires a body",
                self.name
            )));
        }
        if self.object_type == ObjectType::Trigger {
            let mut missing = Vec::new();
            if self.trigger_when.is_none() {
                missing.push("trigger_when");
            }
            if self.trigger_events.is_empty() {
                missing.push("trigger events");
            }
            if self.trigger_table.is_none() {
                missing.push("target table");
            }
            if !missing.is_empty() {
                return Err(DomainError::InvalidDescriptor(format!(
                    "trigger {} is missing {}",
                    self.name,
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn render_create(&self) -> String {
        match self.object_type {
            ObjectType::View => {
                format!("CREATE OR REPLACE VIEW {} AS {}", self.name, self.body)
            }
            ObjectType::Function | ObjectType::Procedure => {
                let args = self
                    .arguments
                    .iter()
                    .map(|(name, sql_type)| format!("{name} {sql_type}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "CREATE OR REPLACE {} {}({}) {}",
                    self.object_type.keyword(),
                    self.name,
                    args,
                    self.body
                )
            }
            ObjectType::Trigger => {
                // validate() guarantees when/events/table are present.
                let when = self.trigger_when.map_or("", TriggerWhen::keyword);
                let events = self
                    .trigger_events
                    .iter()
                    .map(|e| e.keyword())
                    .collect::<Vec<_>>()
                    .join(" OR ");
                let table = self.trigger_table.as_deref().unwrap_or_default();
                let of_clause = if self.trigger_columns.is_empty() {
                    String::new()
                } else {
                    format!(" OF {}", self.trigger_columns.join(", "))
                };
                format!(
                    "CREATE OR REPLACE TRIGGER {} {when} {events}{of_clause} ON {table} {}",
                    self.name, self.body
                )
            }
        }
    }

    fn render_drop(&self) -> String {
        match self.object_type {
            ObjectType::View => format!("DROP VIEW IF EXISTS {}", self.name),
            ObjectType::Function | ObjectType::Procedure => format!(
                "DROP {} IF EXISTS {} CASCADE",
                self.object_type.keyword(),
                self.name
            ),
            ObjectType::Trigger => format!(
                "DROP TRIGGER IF EXISTS {} ON {} CASCADE",
                self.name,
                self.trigger_table.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// A validated descriptor rendered into its paired statements.
#[derive(Debug, Clone)]
pub struct DdlPair {
    /// Kind of object the pair manages.
    pub object_type: ObjectType,
    /// Object name, shared by both statements.
    pub name: String,
    /// Idempotent create-or-replace statement.
    pub create: String,
    /// Idempotent drop-if-exists statement.
    pub drop: String,
}

/// Ordered collection of derived-object statement pairs.
///
/// Registration order is execution order for `materialize_all`; when one
/// object references another (a trigger and its function), the caller
/// registers the dependency first. The registry does not resolve dependencies
/// itself.
#[derive(Debug, Default)]
pub struct DdlRegistry {
    pairs: Vec<DdlPair>,
}

impl DdlRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a descriptor, records its statement pair, and returns the
    /// pair as a handle.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDescriptor`] if required fields for the
    /// descriptor's object type are missing. Nothing is recorded on failure.
    pub fn register(&mut self, object: DerivedObject) -> Result<DdlPair, DomainError> {
        object.validate()?;
        let pair = DdlPair {
            object_type: object.object_type,
            name: object.name.clone(),
            create: object.render_create(),
            drop: object.render_drop(),
        };
        self.pairs.push(pair.clone());
        Ok(pair)
    }

    /// Registered statement pairs in registration order.
    #[must_use]
    pub fn pairs(&self) -> &[DdlPair] {
        &self.pairs
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Executes every create statement in registration order. Intended to run
    /// once after base-table migration.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StorageUnavailable`] on the first statement
    /// that fails.
    pub async fn materialize_all(&self, pool: &PgPool) -> Result<(), DomainError> {
        for pair in &self.pairs {
            sqlx::query(&pair.create).execute(pool).await.map_err(|e| {
                DomainError::StorageUnavailable(format!(
                    "creating {} {}: {e}",
                    pair.object_type.keyword(),
                    pair.name
                ))
            })?;
            tracing::debug!(name = %pair.name, "derived object created");
        }
        tracing::info!(objects = self.pairs.len(), "derived objects materialized");
        Ok(())
    }

    /// Executes every drop statement in reverse registration order, so
    /// dependents go before their dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SchemaTeardownFailure`] on the first statement
    /// that fails.
    pub async fn drop_all(&self, pool: &PgPool) -> Result<(), DomainError> {
        for pair in self.pairs.iter().rev() {
            sqlx::query(&pair.drop).execute(pool).await.map_err(|e| {
                DomainError::SchemaTeardownFailure(format!(
                    "dropping {} {}: {e}",
                    pair.object_type.keyword(),
                    pair.name
                ))
            })?;
        }
        tracing::info!(objects = self.pairs.len(), "derived objects dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_statement_pair() {
        let mut registry = DdlRegistry::new();
        let pair = registry
            .register(DerivedObject::view("trx_v_demo", "SELECT 1 AS one"))
            .unwrap();

        assert_eq!(pair.create, "CREATE OR REPLACE VIEW trx_v_demo AS SELECT 1 AS one");
        assert_eq!(pair.drop, "DROP VIEW IF EXISTS trx_v_demo");
    }

    #[test]
    fn test_function_signature_rendering() {
        let mut registry = DdlRegistry::new();
        let pair = registry
            .register(
                DerivedObject::function(
                    "trx_f_demo",
                    "RETURNS void AS $$ BEGIN END; $$ LANGUAGE plpgsql;",
                )
                .argument("trx_id", "TEXT")
                .argument("amount", "NUMERIC"),
            )
            .unwrap();

        assert!(
            pair.create
                .starts_with("CREATE OR REPLACE FUNCTION trx_f_demo(trx_id TEXT, amount NUMERIC)")
        );
        assert_eq!(pair.drop, "DROP FUNCTION IF EXISTS trx_f_demo CASCADE");
    }

    #[test]
    fn test_procedure_drop_cascades() {
        let mut registry = DdlRegistry::new();
        let pair = registry
            .register(DerivedObject::procedure(
                "trx_p_demo",
                "AS $$ BEGIN END; $$ LANGUAGE plpgsql;",
            ))
            .unwrap();

        assert_eq!(pair.drop, "DROP PROCEDURE IF EXISTS trx_p_demo CASCADE");
    }

    #[test]
    fn test_trigger_with_full_metadata() {
        let mut registry = DdlRegistry::new();
        let pair = registry
            .register(
                DerivedObject::trigger(
                    "trx_tr_demo",
                    "FOR EACH ROW EXECUTE FUNCTION trx_tf_demo()",
                )
                .when(TriggerWhen::Before)
                .on_event(TriggerEvent::Update)
                .on_event(TriggerEvent::Delete)
                .of_column("status")
                .on_table("orders"),
            )
            .unwrap();

        assert_eq!(
            pair.create,
            "CREATE OR REPLACE TRIGGER trx_tr_demo BEFORE UPDATE OR DELETE OF status ON orders \
             FOR EACH ROW EXECUTE FUNCTION trx_tf_demo()"
        );
        assert_eq!(
            pair.drop,
            "DROP TRIGGER IF EXISTS trx_tr_demo ON orders CASCADE"
        );
        assert!(!pair.create.is_empty() && !pair.drop.is_empty());
    }

    #[test]
    fn test_trigger_missing_when_is_rejected() {
        let mut registry = DdlRegistry::new();
        let result = registry.register(
            DerivedObject::trigger("trx_tr_demo", "FOR EACH ROW EXECUTE FUNCTION f()")
                .on_event(TriggerEvent::Update)
                .on_table("orders"),
        );

        match result {
            Err(DomainError::InvalidDescriptor(msg)) => assert!(msg.contains("trigger_when")),
            other => panic!("expected InvalidDescriptor, got {other:?}"),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_trigger_missing_events_and_table_lists_both() {
        let mut registry = DdlRegistry::new();
        let result = registry.register(
            DerivedObject::trigger("trx_tr_demo", "FOR EACH ROW EXECUTE FUNCTION f()")
                .when(TriggerWhen::After),
        );

        match result {
            Err(DomainError::InvalidDescriptor(msg)) => {
                assert!(msg.contains("trigger events"));
                assert!(msg.contains("target table"));
            }
            other => panic!("expected InvalidDescriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut registry = DdlRegistry::new();
        let result = registry.register(DerivedObject::view("  ", "SELECT 1"));
        assert!(matches!(result, Err(DomainError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_empty_body_is_rejected() {
        let mut registry = DdlRegistry::new();
        let result = registry.register(DerivedObject::view("trx_v_demo", ""));
        assert!(matches!(result, Err(DomainError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut registry = DdlRegistry::new();
        registry
            .register(DerivedObject::view("trx_v_first", "SELECT 1"))
            .unwrap();
        registry
            .register(DerivedObject::view("trx_v_second", "SELECT 2"))
            .unwrap();

        let names: Vec<&str> = registry.pairs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["trx_v_first", "trx_v_second"]);
        assert_eq!(registry.len(), 2);
    }
}
