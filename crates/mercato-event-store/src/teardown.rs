//! Bulk teardown of derived objects.

use mercato_core::error::DomainError;
use sqlx::PgPool;

/// Drops every derived object in the public schema by calling the
/// `drop_all_db_objects()` stored procedure installed by migration: all
/// views, all triggers, and all `trx_`-prefixed functions.
///
/// Used to reset state between test runs. Idempotent and safe on an empty
/// schema; the procedure enumerates `information_schema` rather than relying
/// on the in-memory registry, so it also removes objects registered by a
/// previous process.
///
/// # Errors
///
/// Returns [`DomainError::SchemaTeardownFailure`] if the procedure hits a
/// dependency it cannot resolve.
pub async fn drop_all_db_objects(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::query("CALL drop_all_db_objects()")
        .execute(pool)
        .await
        .map_err(|e| DomainError::SchemaTeardownFailure(e.to_string()))?;
    tracing::info!("all derived database objects dropped");
    Ok(())
}
