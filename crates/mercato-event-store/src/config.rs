//! Database settings read from the environment.

use std::time::Duration;

use mercato_core::error::DomainError;

/// Sizing for one connection pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Maximum number of connections held by the pool.
    pub max_connections: u32,
    /// How long an acquire may wait before failing with pool exhaustion.
    pub acquire_timeout: Duration,
}

/// Connection settings for both pools.
///
/// The transactional pool serves all state-mutating work; the autocommit pool
/// serves read-only queries and is sized larger since its checkouts are
/// single-statement.
#[derive(Debug, Clone)]
pub struct DbSettings {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Sizing for the transactional (read-write) pool.
    pub transactional: PoolSettings,
    /// Sizing for the autocommit (read-only) pool.
    pub autocommit: PoolSettings,
}

impl DbSettings {
    /// Reads settings from the environment.
    ///
    /// `DATABASE_URL` is required. `DB_POOL_SIZE` (default 10),
    /// `DB_READ_POOL_SIZE` (default 20), and `DB_ACQUIRE_TIMEOUT_SECS`
    /// (default 30) are optional.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `DATABASE_URL` is unset or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, DomainError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            DomainError::Validation("DATABASE_URL environment variable must be set".into())
        })?;
        let write_size = parse_u32("DB_POOL_SIZE", std::env::var("DB_POOL_SIZE").ok(), 10)?;
        let read_size = parse_u32(
            "DB_READ_POOL_SIZE",
            std::env::var("DB_READ_POOL_SIZE").ok(),
            20,
        )?;
        let timeout_secs = parse_u32(
            "DB_ACQUIRE_TIMEOUT_SECS",
            std::env::var("DB_ACQUIRE_TIMEOUT_SECS").ok(),
            30,
        )?;
        let acquire_timeout = Duration::from_secs(u64::from(timeout_secs));

        Ok(Self {
            database_url,
            transactional: PoolSettings {
                max_connections: write_size,
                acquire_timeout,
            },
            autocommit: PoolSettings {
                max_connections: read_size,
                acquire_timeout,
            },
        })
    }
}

fn parse_u32(name: &str, raw: Option<String>, default: u32) -> Result<u32, DomainError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| DomainError::Validation(format!("{name} must be a positive integer: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u32_uses_default_when_unset() {
        assert_eq!(parse_u32("DB_POOL_SIZE", None, 10).unwrap(), 10);
    }

    #[test]
    fn test_parse_u32_parses_value() {
        assert_eq!(
            parse_u32("DB_POOL_SIZE", Some("5".to_string()), 10).unwrap(),
            5
        );
    }

    #[test]
    fn test_parse_u32_rejects_garbage() {
        let result = parse_u32("DB_POOL_SIZE", Some("ten".to_string()), 10);
        match result {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("DB_POOL_SIZE")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
