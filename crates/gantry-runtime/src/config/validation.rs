//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, CooldownConfig, GantryConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &GantryConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_cooldown_config(&config.cooldown)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::validation("The command prefix cannot be empty"));
    }
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "The command prefix cannot contain whitespace",
        ));
    }
    Ok(())
}

fn validate_cooldown_config(cooldown: &CooldownConfig) -> ConfigResult<()> {
    if cooldown.notice_throttle_secs == 0 {
        return Err(ConfigError::validation(
            "Cooldown notice throttle must be greater than 0",
        ));
    }
    if cooldown.sweep_interval_secs == 0 {
        return Err(ConfigError::validation(
            "Cooldown sweep interval must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter target: '{module}'"
        )));
    }
    Ok(())
}
