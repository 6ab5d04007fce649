//! Dual connection pool manager.

use mercato_core::error::DomainError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DbSettings;

/// Two independently sized pools over the same database.
///
/// All state-mutating operations open explicit transactions on
/// `transactional`. Read-only queries run on `autocommit`, where each
/// statement executes on a fresh checkout with no open transaction, so read
/// traffic never sits "idle in transaction" blocking writers.
#[derive(Debug, Clone)]
pub struct DbPools {
    /// Read-write pool with explicit commit/rollback boundaries.
    pub transactional: PgPool,
    /// Read-only pool; no transaction is held across statements.
    pub autocommit: PgPool,
}

impl DbPools {
    /// Connects both pools.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::StorageUnavailable`] if either pool fails to
    /// connect.
    pub async fn connect(settings: &DbSettings) -> Result<Self, DomainError> {
        let transactional = PgPoolOptions::new()
            .max_connections(settings.transactional.max_connections)
            .acquire_timeout(settings.transactional.acquire_timeout)
            .connect(&settings.database_url)
            .await
            .map_err(|e| {
                DomainError::StorageUnavailable(format!("transactional pool: {e}"))
            })?;
        let autocommit = PgPoolOptions::new()
            .max_connections(settings.autocommit.max_connections)
            .acquire_timeout(settings.autocommit.acquire_timeout)
            .connect(&settings.database_url)
            .await
            .map_err(|e| DomainError::StorageUnavailable(format!("autocommit pool: {e}")))?;

        tracing::info!(
            write_connections = settings.transactional.max_connections,
            read_connections = settings.autocommit.max_connections,
            "database pools connected"
        );
        Ok(Self {
            transactional,
            autocommit,
        })
    }

    /// Serves both roles from a single externally constructed pool. Intended
    /// for test harnesses that hand out one pool per test database.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            transactional: pool.clone(),
            autocommit: pool,
        }
    }

    /// Closes both pools, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.transactional.close().await;
        self.autocommit.close().await;
        tracing::info!("database pools closed");
    }
}
