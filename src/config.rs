use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::services::DdlFailurePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub dispatcher: DispatcherConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// JSON file with the server descriptors
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    pub max_concurrent: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub chunk_size: usize,
    pub load_timeout_secs: u64,
    pub ddl_failure_policy: DdlFailurePolicy,
    /// Password for Oracle users created as import schemas
    pub oracle_schema_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Environment variable to config key
const ENV_OVERRIDES: [(&str, &str); 10] = [
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("SERVERS_CONFIG", "registry.path"),
    ("MAX_CONCURRENT_QUERIES", "dispatcher.max_concurrent"),
    ("QUERY_TIMEOUT_SECS", "dispatcher.timeout_secs"),
    ("IMPORT_CHUNK_SIZE", "import.chunk_size"),
    ("IMPORT_TIMEOUT_SECS", "import.load_timeout_secs"),
    ("DDL_FAILURE_POLICY", "import.ddl_failure_policy"),
    ("ORACLE_SCHEMA_PASSWORD", "import.oracle_schema_password"),
    ("RUST_LOG", "logging.level"),
];

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let vars: Vec<(&str, String)> = ENV_OVERRIDES
            .iter()
            .filter_map(|(var, key)| env::var(var).ok().map(|value| (*key, value)))
            .collect();

        Self::from_overrides(vars)
    }

    /// Defaults with the given key/value overrides applied
    pub fn from_overrides<K, V>(
        overrides: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, config::ConfigError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("registry.path", "servers.json")?
            .set_default("dispatcher.max_concurrent", 10)?
            .set_default("dispatcher.timeout_secs", 30)?
            .set_default("import.chunk_size", 1000)?
            .set_default("import.load_timeout_secs", 600)?
            .set_default("import.ddl_failure_policy", "fail_fast")?
            .set_default("logging.level", "info")?;

        for (key, value) in overrides {
            builder = builder.set_override(key.as_ref(), value.into())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.dispatcher.max_concurrent == 0 {
            return Err(config::ConfigError::Message(
                "dispatcher.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.timeout_secs == 0 || self.import.load_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if self.import.chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "import.chunk_size must be at least 1".to_string(),
            ));
        }
        // Oracle quoted passwords cannot contain a double quote
        if let Some(password) = &self.import.oracle_schema_password {
            if password.contains('"') {
                return Err(config::ConfigError::Message(
                    "import.oracle_schema_password must not contain '\"'".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatcher.timeout_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.import.load_timeout_secs)
    }

    /// Configured Oracle schema password, or a fresh random one for this process
    pub fn oracle_schema_password(&self) -> String {
        self.import
            .oracle_schema_password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("Imp{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> Vec<(&'static str, String)> {
        Vec::new()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_overrides(no_overrides()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.registry.path, "servers.json");
        assert_eq!(config.dispatcher.max_concurrent, 10);
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.import.chunk_size, 1000);
        assert_eq!(config.load_timeout(), Duration::from_secs(600));
        assert_eq!(config.import.ddl_failure_policy, DdlFailurePolicy::FailFast);
        assert!(config.import.oracle_schema_password.is_none());
        assert_eq!(config.server_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = tokio_test::assert_ok!(Config::from_overrides([
            ("server.port", "8080"),
            ("dispatcher.max_concurrent", "3"),
            ("import.ddl_failure_policy", "continue"),
            ("import.oracle_schema_password", "Secret1"),
        ]));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dispatcher.max_concurrent, 3);
        assert_eq!(config.import.ddl_failure_policy, DdlFailurePolicy::Continue);
        assert_eq!(config.oracle_schema_password(), "Secret1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_overrides([("dispatcher.max_concurrent", "0")]).is_err());
        assert!(Config::from_overrides([("server.port", "not-a-port")]).is_err());
        assert!(Config::from_overrides([("import.ddl_failure_policy", "retry")]).is_err());
        assert!(Config::from_overrides([("import.ddl_failure_policy", "fail-fast")]).is_err());
    }

    #[test]
    fn test_oracle_password_with_double_quote_rejected() {
        let err = tokio_test::assert_err!(Config::from_overrides([(
            "import.oracle_schema_password",
            "pa\"ss"
        )]));
        assert!(err.to_string().contains("oracle_schema_password"));

        let config =
            tokio_test::assert_ok!(Config::from_overrides([("import.oracle_schema_password", "it's")]));
        assert_eq!(config.oracle_schema_password(), "it's");
    }

    #[test]
    fn test_generated_oracle_password_shape() {
        let config = Config::from_overrides(no_overrides()).unwrap();
        let password = config.oracle_schema_password();
        assert!(password.starts_with("Imp"));
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
