use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LogFormat};
use crate::infrastructure::observability::{init_tracing, TracingConfig};

pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the configured level when it parses.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

impl From<&AppConfig> for LoggingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            level: config.logging.level.clone(),
            format: config.logging.format.clone(),
        }
    }
}

/// Local logging only, for short-lived commands
pub fn init_logging(config: &LoggingConfig) {
    init_tracing(config, &TracingConfig::default());
}
