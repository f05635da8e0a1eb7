//! Application configuration
//!
//! Layered resolution: compiled defaults, then `HIKARI_*` environment
//! variables, then CLI flags. Read once at startup; immutable afterwards.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, bail};

use super::cli::CliConfig;
use super::constants::{
    DEFAULT_BUFFER_MAX_SIZE, DEFAULT_DB_RETRY_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_RETENTION_DAYS, DEFAULT_WRITE_BATCH_SIZE, ENV_BUFFER_MAX_SIZE, ENV_DATABASE_URL,
    ENV_DB_MAX_CONNECTIONS, ENV_DB_RETRY_INTERVAL_SECONDS, ENV_HOST, ENV_PORT, ENV_RETENTION_DAYS,
    ENV_WRITE_BATCH_SIZE, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
};

/// Server configuration section
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration section
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub statement_timeout_secs: u64,
}

/// Collector behavior section: buffering, batching, retention
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub buffer_max_size: usize,
    pub write_batch_size: usize,
    pub db_retry_interval_secs: u64,
    pub retention_days: u32,
}

impl CollectorConfig {
    pub fn db_retry_interval(&self) -> Duration {
        Duration::from_secs(self.db_retry_interval_secs)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub collector: CollectorConfig,
}

impl AppConfig {
    /// Resolve the full configuration. Fails when no database URL is
    /// provided or a bound is nonsensical.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let url = cli
            .database_url
            .clone()
            .or_else(|| env_string(ENV_DATABASE_URL))
            .unwrap_or_default();
        if url.is_empty() {
            bail!(
                "No database URL configured. Set {} or pass --database-url.",
                ENV_DATABASE_URL
            );
        }

        let config = Self {
            server: ServerConfig {
                host: cli
                    .host
                    .clone()
                    .or_else(|| env_string(ENV_HOST))
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: cli
                    .port
                    .or_else(|| env_parse(ENV_PORT))
                    .unwrap_or(DEFAULT_PORT),
            },
            database: DatabaseConfig {
                url,
                max_connections: env_parse(ENV_DB_MAX_CONNECTIONS)
                    .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
                min_connections: POSTGRES_DEFAULT_MIN_CONNECTIONS,
                acquire_timeout_secs: POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
                idle_timeout_secs: POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
                max_lifetime_secs: POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
                statement_timeout_secs: POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
            },
            collector: CollectorConfig {
                buffer_max_size: env_parse(ENV_BUFFER_MAX_SIZE)
                    .unwrap_or(DEFAULT_BUFFER_MAX_SIZE),
                write_batch_size: env_parse(ENV_WRITE_BATCH_SIZE)
                    .unwrap_or(DEFAULT_WRITE_BATCH_SIZE),
                db_retry_interval_secs: env_parse(ENV_DB_RETRY_INTERVAL_SECONDS)
                    .unwrap_or(DEFAULT_DB_RETRY_INTERVAL_SECS),
                retention_days: env_parse(ENV_RETENTION_DAYS).unwrap_or(DEFAULT_RETENTION_DAYS),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.collector.buffer_max_size == 0 {
            bail!("{} must be at least 1", ENV_BUFFER_MAX_SIZE);
        }
        if self.collector.write_batch_size == 0 {
            bail!("{} must be at least 1", ENV_WRITE_BATCH_SIZE);
        }
        if self.collector.retention_days == 0 {
            bail!("{} must be at least 1", ENV_RETENTION_DAYS);
        }
        if self.database.max_connections == 0 {
            bail!("{} must be at least 1", ENV_DB_MAX_CONNECTIONS);
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_url() -> CliConfig {
        CliConfig {
            host: None,
            port: None,
            database_url: Some("postgres://localhost/hikari".to_string()),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::load(&cli_with_url()).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.collector.buffer_max_size, DEFAULT_BUFFER_MAX_SIZE);
        assert_eq!(config.collector.write_batch_size, DEFAULT_WRITE_BATCH_SIZE);
        assert_eq!(
            config.collector.db_retry_interval(),
            Duration::from_secs(DEFAULT_DB_RETRY_INTERVAL_SECS)
        );
        assert_eq!(config.collector.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = CliConfig {
            host: Some("10.0.0.1".to_string()),
            port: Some(9100),
            database_url: Some("postgres://localhost/hikari".to_string()),
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_missing_database_url_fails() {
        let cli = CliConfig::default();
        // Only meaningful when the variable is not set in the test env.
        if std::env::var(ENV_DATABASE_URL).is_err() {
            assert!(AppConfig::load(&cli).is_err());
        }
    }
}
