//! Service context wiring the persistence stack in a defined order.

use mercato_core::error::DomainError;
use sqlx::migrate::Migrator;

use crate::config::DbSettings;
use crate::ddl::DdlRegistry;
use crate::pg_event_store::PgEventStore;
use crate::pool::DbPools;
use crate::teardown;

/// Workspace migrations, embedded so callers need no filesystem access.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Owns the connection pools and the derived-object registry, with explicit
/// initialization and teardown orders. Replaces module-level engine globals
/// with a handle that is constructed once and passed down.
#[derive(Debug)]
pub struct StoreContext {
    pools: DbPools,
    registry: DdlRegistry,
}

impl StoreContext {
    /// Initializes the persistence stack: connect pools, apply schema
    /// migrations, then materialize the registered derived objects, in that
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StorageUnavailable`] if pools cannot connect,
    /// migrations fail, or a derived object cannot be created.
    pub async fn initialize(
        settings: &DbSettings,
        registry: DdlRegistry,
    ) -> Result<Self, DomainError> {
        let pools = DbPools::connect(settings).await?;
        MIGRATOR
            .run(&pools.transactional)
            .await
            .map_err(|e| DomainError::StorageUnavailable(format!("schema migration: {e}")))?;
        registry.materialize_all(&pools.transactional).await?;
        tracing::info!(derived_objects = registry.len(), "store context initialized");
        Ok(Self { pools, registry })
    }

    /// Wraps already-connected pools and materializes the registry over them.
    /// Migrations are assumed to have been applied by the harness that built
    /// the pools.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StorageUnavailable`] if a derived object cannot
    /// be created.
    pub async fn with_pools(pools: DbPools, registry: DdlRegistry) -> Result<Self, DomainError> {
        registry.materialize_all(&pools.transactional).await?;
        Ok(Self { pools, registry })
    }

    /// The managed pools.
    #[must_use]
    pub fn pools(&self) -> &DbPools {
        &self.pools
    }

    /// An event store over the managed pools.
    #[must_use]
    pub fn event_store(&self) -> PgEventStore {
        PgEventStore::new(self.pools.clone())
    }

    /// Bulk-drops all derived objects and re-materializes the registered
    /// ones. Used to reset schema state between test runs.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SchemaTeardownFailure`] if the bulk drop fails,
    /// or [`DomainError::StorageUnavailable`] if re-creation fails.
    pub async fn reset_derived_objects(&self) -> Result<(), DomainError> {
        teardown::drop_all_db_objects(&self.pools.transactional).await?;
        self.registry
            .materialize_all(&self.pools.transactional)
            .await
    }

    /// Tears the stack down in reverse order: drop derived objects, then
    /// close both pools.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SchemaTeardownFailure`] if the bulk drop fails;
    /// pools are left open in that case so the caller can inspect state.
    pub async fn teardown(self) -> Result<(), DomainError> {
        teardown::drop_all_db_objects(&self.pools.transactional).await?;
        self.pools.close().await;
        Ok(())
    }
}
