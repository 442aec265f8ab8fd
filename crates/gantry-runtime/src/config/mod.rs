//! Configuration module for the Gantry runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the command prefix, cooldown housekeeping and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, CooldownConfig, GantryConfig, LogFormat, LogOutput, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
