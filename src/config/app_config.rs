use config::Map;
use serde::Deserialize;

use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests running longer than this are answered with 408
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which store backs the user registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[serde(alias = "inmemory", alias = "in-memory", alias = "in_memory")]
    Memory,
    #[default]
    #[serde(alias = "sqlite3")]
    Sqlite,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file
    pub path: String,
    /// Full PostgreSQL connection URL; takes precedence over the discrete fields
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// How domain failures are reported over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// One status code per error kind
    #[default]
    Detailed,
    /// Every register/update failure is a 500
    Legacy,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    pub error_mode: ErrorMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: "test.db".to_string(),
            database_url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "password".to_string(),
            name: "user_registry".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

impl StorageConfig {
    /// Connection URL: `database_url`, then `DATABASE_URL`, then the discrete fields
    pub fn connection_url(&self) -> String {
        self.resolve_url(std::env::var("DATABASE_URL").ok())
    }

    fn resolve_url(&self, env_url: Option<String>) -> String {
        self.database_url
            .clone()
            .filter(|url| !url.is_empty())
            .or(env_url.filter(|url| !url.is_empty()))
            .unwrap_or_else(|| {
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    self.user, self.password, self.host, self.port, self.name
                )
            })
    }
}

/// Unprefixed variables accepted for existing deployments, with their config keys
const PLAIN_ENV_KEYS: [(&str, &str); 8] = [
    ("PORT", "SERVER__PORT"),
    ("DB_TYPE", "STORAGE__BACKEND"),
    ("DB_PATH", "STORAGE__PATH"),
    ("DB_HOST", "STORAGE__HOST"),
    ("DB_PORT", "STORAGE__PORT"),
    ("DB_USER", "STORAGE__USER"),
    ("DB_PASSWORD", "STORAGE__PASSWORD"),
    ("DB_NAME", "STORAGE__NAME"),
];

/// Environment source built from the unprefixed variables found in `vars`.
///
/// Empty values are ignored. `APP__*` variables still take precedence.
fn plain_environment(vars: impl IntoIterator<Item = (String, String)>) -> config::Environment {
    let mut mapped = Map::new();

    for (name, value) in vars {
        if value.is_empty() {
            continue;
        }
        if let Some((_, key)) = PLAIN_ENV_KEYS.iter().find(|(plain, _)| *plain == name) {
            mapped.insert((*key).to_string(), value);
        }
    }

    config::Environment::default()
        .separator("__")
        .try_parsing(true)
        .source(Some(mapped))
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(plain_environment(std::env::vars()))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
