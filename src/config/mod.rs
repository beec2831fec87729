//! Application configuration

mod app_config;

pub use app_config::{AnalysisConfig, AppConfig, LogFormat, LoggingConfig};
