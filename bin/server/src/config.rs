//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys:
//!
//! ```text
//! BIND_ADDR=0.0.0.0:3000
//! STORE__KIND=postgres
//! STORE__DATABASE_URL=postgres://localhost/flowline
//! STORE__MAX_CONNECTIONS=10
//! ```

use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Where workflow graphs are kept.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which workflow store backs the sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local; everything is lost on restart.
    #[default]
    Memory,
    /// One JSON document per workflow under `root`.
    File { root: PathBuf },
    /// PostgreSQL. Requires the `postgres` feature.
    Postgres {
        database_url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_environment(config::Environment::default().source(Some(source)))
    }

    #[test]
    fn defaults_to_memory_store_on_localhost() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn reads_file_store() {
        let config = load(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("STORE__KIND", "file"),
            ("STORE__ROOT", "/var/lib/flowline"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(
            config.store,
            StoreConfig::File {
                root: PathBuf::from("/var/lib/flowline"),
            }
        );
    }

    #[test]
    fn postgres_pool_size_has_default() {
        let config = load(&[
            ("STORE__KIND", "postgres"),
            ("STORE__DATABASE_URL", "postgres://localhost/flowline"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/flowline".to_string(),
                max_connections: 5,
            }
        );
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        assert!(load(&[("STORE__KIND", "redis")]).is_err());
    }
}
