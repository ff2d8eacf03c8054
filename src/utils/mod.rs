//! Configuration loading and validation

pub mod config;

pub use config::{
    ConfigError, ConfigOverrides, ConfigurationManager, LoggingConfig, MissionConfig,
    NavigationConfig, OverrideResult, SystemConfig, UsblConfig, ValidationResult,
};
