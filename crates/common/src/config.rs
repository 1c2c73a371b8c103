//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "INKPOST";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Counter reconciliation configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Periodic reconciliation of denormalized counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between runs. `0` disables the background job.
    #[serde(default)]
    pub interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `INKPOST_ENV`)
    /// 3. Environment variables with `INKPOST__` prefix, e.g. `INKPOST__DATABASE__URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is not an error
        dotenvy::dotenv().ok();

        let env = std::env::var("INKPOST_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                [database]
                url = "postgres://localhost/inkpost"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.reconcile.interval_secs, 0);
    }

    #[test]
    fn test_deserialize_json_log_format() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080
                [database]
                url = "postgres://localhost/inkpost"
                [log]
                format = "json"
                [reconcile]
                interval_secs = 3600
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.reconcile.interval_secs, 3600);
    }
}
