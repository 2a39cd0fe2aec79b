use serde::{Deserialize, Serialize};
use std::env;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "CLIENTDB_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_request_logging: bool,
    /// Allowed CORS origins; empty mirrors whatever origin the caller sends
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source. Keys are
    /// passed without the `CLIENTDB_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        let environment = match var("ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(var)
    }

    fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database overrides
        if let Some(v) = var("DB_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = DatabaseBackend::Memory,
                "postgres" | "postgresql" => self.database.backend = DatabaseBackend::Postgres,
                _ => {}
            }
        }
        if let Some(v) = var("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = var("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = var("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = var("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = var("DB_PASSWORD") {
            self.database.password = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = var("DB_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DB_CONNECT_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = var("API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = var("API_PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = var("API_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = var("CORS_ORIGINS") {
            self.api.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }

        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                enable_request_logging: true,
                ..ApiConfig::default()
            },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                enable_request_logging: true,
                ..ApiConfig::default()
            },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                enable_request_logging: false,
                ..ApiConfig::default()
            },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            name: "clientdb".to_string(),
            user: "postgres".to_string(),
            password: None,
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_request_logging: true,
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_development_config() {
        let config = config_from(&[]);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database.backend, DatabaseBackend::Postgres);
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "clientdb");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.port, 8080);
        assert!(config.api.enable_request_logging);
        assert!(config.api.cors_origins.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_production_config() {
        let config = config_from(&[("ENV", "production")]);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ENV", "staging"),
            ("DB_BACKEND", "memory"),
            ("DB_PASSWORD", "secret"),
            ("DB_MAX_CONNECTIONS", "3"),
            ("API_PORT", "9090"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("LOG_LEVEL", "debug"),
        ]);
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.api.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unparsable_values_keep_preset() {
        let config = config_from(&[("DB_PORT", "not-a-port"), ("API_REQUEST_LOGGING", "maybe")]);
        assert_eq!(config.database.port, 5432);
        assert!(config.api.enable_request_logging);
    }
}
