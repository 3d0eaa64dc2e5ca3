use std::env;
use std::str::FromStr;

use pagestack_core::VersionPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which document store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// Deployment stage label, only logged.
    pub stage: String,
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL. Required for the postgres backend.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Table holding sites and pages.
    pub table_name: String,
    /// Secondary index over `(type, path)`.
    pub type_path_index: String,
    pub version_policy: VersionPolicy,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let store_backend = parse(&lookup, "STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 3030)?,
            stage: text("STAGE", "dev"),
            store_backend,
            database_url,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: parse(&lookup, "DB_MIN_CONNECTIONS", 1)?,
            table_name: text("TABLE_NAME", "documents"),
            type_path_index: text("TYPE_PATH_INDEX", "type-path-index"),
            version_policy: parse(&lookup, "VERSION_POLICY", VersionPolicy::Overwrite)?,
            log_level: text("LOG_LEVEL", "info"),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_for_memory_backend() {
        let config = load(&[("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3030");
        assert_eq!(config.table_name, "documents");
        assert_eq!(config.type_path_index, "type-path-index");
        assert_eq!(config.version_policy, VersionPolicy::Overwrite);
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));

        let config = load(&[("DATABASE_URL", "postgres://localhost/pages")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("STORE_BACKEND", "memory"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = load(&[("STORE_BACKEND", "memory"), ("VERSION_POLICY", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "VERSION_POLICY", .. }));
    }

    #[test]
    fn version_policy_is_configurable() {
        let config = load(&[("STORE_BACKEND", "memory"), ("VERSION_POLICY", "compare-and-swap")])
            .unwrap();
        assert_eq!(config.version_policy, VersionPolicy::CompareAndSwap);
    }
}
