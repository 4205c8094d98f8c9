//! Application configuration

mod app_config;

pub use app_config::{
    ApiConfig, AppConfig, ErrorMode, LogFormat, LoggingConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
