//! Application configuration loaded from files and `APP__*` variables

mod app_config;

pub use app_config::{AppConfig, LogFormat, LoggingConfig, StoreConfig};
