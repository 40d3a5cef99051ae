//! PostgreSQL pool settings.
//!
//! The service is webhook-driven and read-light, so the pool stays
//! small and the acquire timeout short: a saturated pool should fail a
//! delivery fast (the provider retries) rather than queue it.

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Database section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request may wait for a connection, in seconds.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Apply pending migrations at startup. On by default; disable when
    /// migrations are rolled out separately from the binary.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Pool builder carrying this section's limits.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE_URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_run_migrations() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://themevault@localhost/themevault".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_validate_once_url_is_set() {
        let config = with_url();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_connections, 10);
        assert!(config.run_migrations);
    }

    #[test]
    fn missing_url_is_rejected() {
        assert!(DatabaseConfig::default().validate().is_err());
    }

    #[test]
    fn non_postgres_scheme_is_rejected() {
        let config = DatabaseConfig {
            url: "mysql://localhost/themevault".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn pool_size_must_be_between_one_and_hundred() {
        let mut config = with_url();
        config.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPoolSize)
        ));

        config.max_connections = 101;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPoolSize)
        ));
    }

    #[test]
    fn zero_acquire_timeout_is_rejected() {
        let mut config = with_url();
        config.acquire_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeout)
        ));
    }
}
