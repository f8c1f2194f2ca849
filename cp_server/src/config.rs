//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use club_poker::db::DatabaseConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:6970";

/// Default deadline for a finalize, in seconds
pub const DEFAULT_SETTLEMENT_TIMEOUT_SECS: u64 = 10;

/// Where tournaments are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// PostgreSQL through `sqlx`
    Postgres(DatabaseConfig),
    /// Process memory; everything is lost on shutdown
    Memory,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Tournament store
    pub store: StoreConfig,
    /// Deadline for a finalize before it is rolled back
    pub settlement_timeout: Duration,
    /// Prometheus scrape address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Use the in-memory store instead of PostgreSQL
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", default_bind())?,
        };

        let store = if memory {
            StoreConfig::Memory
        } else {
            let database_url = database_url_override
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Pass --db-url, set DATABASE_URL, or run with --memory".to_string(),
                })?;
            let database = DatabaseConfig::with_url(database_url).map_err(|e| {
                ConfigError::Invalid {
                    var: "DB_*".to_string(),
                    reason: e.to_string(),
                }
            })?;
            StoreConfig::Postgres(database)
        };

        let settlement_timeout = Duration::from_secs(parse_env_or(
            "SETTLEMENT_TIMEOUT_SECS",
            DEFAULT_SETTLEMENT_TIMEOUT_SECS,
        )?);

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.trim().is_empty() => {
                Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            store,
            settlement_timeout,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settlement_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SETTLEMENT_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let StoreConfig::Postgres(database) = &self.store {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from the server bind address".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6970))
}

/// Helper to parse environment variable with default fallback.
/// A set but unparsable value is an error rather than silently ignored.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}' could not be parsed"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn memory_config() -> ServerConfig {
        ServerConfig {
            bind: default_bind(),
            store: StoreConfig::Memory,
            settlement_timeout: Duration::from_secs(DEFAULT_SETTLEMENT_TIMEOUT_SECS),
            metrics_bind: None,
        }
    }

    #[test]
    fn test_default_bind_matches_constant() {
        assert_eq!(default_bind(), DEFAULT_BIND.parse().unwrap());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use --memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use --memory"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = ServerConfig {
            settlement_timeout: Duration::ZERO,
            ..memory_config()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut database = DatabaseConfig::development();
        database.min_connections = 20;
        database.max_connections = 5;
        let config = ServerConfig {
            store: StoreConfig::Postgres(database),
            ..memory_config()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_config_validation_metrics_port_clash() {
        let config = ServerConfig {
            metrics_bind: Some(default_bind()),
            ..memory_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_memory_ignores_database_url() {
        unsafe {
            std::env::remove_var("SETTLEMENT_TIMEOUT_SECS");
            std::env::remove_var("METRICS_BIND");
        }
        let config = ServerConfig::from_env(None, None, true).unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(
            config.settlement_timeout,
            Duration::from_secs(DEFAULT_SETTLEMENT_TIMEOUT_SECS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_timeout() {
        unsafe {
            std::env::set_var("SETTLEMENT_TIMEOUT_SECS", "soon");
        }
        let result = ServerConfig::from_env(None, None, true);
        unsafe {
            std::env::remove_var("SETTLEMENT_TIMEOUT_SECS");
        }
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_from_env_uses_cli_database_url() {
        unsafe {
            std::env::remove_var("SETTLEMENT_TIMEOUT_SECS");
            std::env::remove_var("METRICS_BIND");
        }
        let config = ServerConfig::from_env(
            Some("0.0.0.0:9000".parse().unwrap()),
            Some("postgres://club@db/club_poker".to_string()),
            false,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000".parse().unwrap());
        match config.store {
            StoreConfig::Postgres(database) => {
                assert_eq!(database.database_url, "postgres://club@db/club_poker")
            }
            StoreConfig::Memory => panic!("expected a PostgreSQL store"),
        }
    }
}
